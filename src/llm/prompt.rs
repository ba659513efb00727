// Prompt template for the narrative recommendation strategy.
//
// Builds a compact, structured prompt embedding pre-computed analysis
// (market pool, fixture runs, special gameweeks) so the model focuses on
// trade-offs rather than arithmetic, and pins the reply to the exact JSON
// schema the engine parses.

use crate::engine::fixtures::teams_with_easy_run;
use crate::model::Chip;
use crate::strategy::AnalysisContext;

/// How many market players are listed in the prompt.
const MARKET_PROMPT_LIMIT: usize = 30;

/// How many easy-fixture teams are listed in the prompt.
const EASY_TEAM_PROMPT_LIMIT: usize = 10;

/// How many upcoming fixtures are shown per easy-fixture team.
const FIXTURES_PER_TEAM: usize = 5;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Static system prompt for the weekly advisory call.
pub fn system_prompt() -> String {
    "You are an expert Fantasy Premier League manager. Analyze the current team \
     and recommend transfers, captain picks, AND chip strategy.\n\
     \n\
     Focus on form, fixtures, and value. Be strategic about chip usage - don't \
     waste them! Use the pre-computed numbers provided; do NOT do arithmetic.\n\
     Respond with exactly one JSON object in the requested schema and nothing \
     else around it that could be mistaken for JSON."
        .to_string()
}

// ---------------------------------------------------------------------------
// Analysis prompt
// ---------------------------------------------------------------------------

/// Build the full analysis prompt from the enriched context.
pub fn build_analysis_prompt(ctx: &AnalysisContext) -> String {
    let mut prompt = String::with_capacity(4096);

    // Section 1: current squad
    prompt.push_str(&format!(
        "## Current Squad (GW{})\nBudget: £{:.1}m | Free Transfers: {}\n",
        ctx.gameweek, ctx.budget, ctx.free_transfers,
    ));
    for member in &ctx.squad {
        let p = &member.player;
        prompt.push_str(&format!(
            "- {} ({}, {}) - Form: {}, Points: {}, Price: £{}m",
            p.name,
            p.position.display_str(),
            p.team,
            p.form,
            p.total_points,
            p.price,
        ));
        if !p.news.is_empty() {
            prompt.push_str(&format!(" [NEWS: {}]", p.news));
        }
        prompt.push('\n');
    }
    prompt.push('\n');

    // Section 2: market pool by form
    prompt.push_str("## Top Available Players by Form\n");
    for p in ctx.market.iter().take(MARKET_PROMPT_LIMIT) {
        prompt.push_str(&format!(
            "- {} ({}, {}) - Form: {}, Points: {}, Price: £{}m, xGI: {:.2}",
            p.name,
            p.position.display_str(),
            p.team,
            p.form,
            p.total_points,
            p.price,
            p.expected_goal_involvements,
        ));
        if !p.news.is_empty() {
            prompt.push_str(&format!(" [NEWS: {}]", p.news));
        }
        prompt.push('\n');
    }
    prompt.push('\n');

    // Section 3: fixture difficulty
    prompt.push_str("## Fixture Difficulty (Next 5 GWs)\nTeams with easy fixtures (FDR 2 or less):\n");
    let easy_teams = teams_with_easy_run(&ctx.profiles);
    if easy_teams.is_empty() {
        prompt.push_str("(none)\n");
    }
    for team in easy_teams.iter().take(EASY_TEAM_PROMPT_LIMIT) {
        let runs = ctx.profiles[team]
            .iter()
            .take(FIXTURES_PER_TEAM)
            .map(|f| {
                format!(
                    "GW{}({}{})",
                    f.gameweek,
                    f.difficulty,
                    if f.is_home { "H" } else { "A" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("- Team {team}: {runs}\n"));
    }
    prompt.push('\n');

    // Section 4: special gameweeks
    prompt.push_str("## Special Gameweeks Detected\n");
    if ctx.special_gameweeks.is_empty() {
        prompt.push_str("No blank or double gameweeks detected in next 10 GWs\n");
    } else {
        for s in &ctx.special_gameweeks {
            prompt.push_str(&format!(
                "- GW{}: {} teams with doubles, {} teams blanking\n",
                s.gameweek, s.teams_with_double, s.teams_blank,
            ));
        }
    }
    prompt.push('\n');

    // Section 5: chips
    prompt.push_str("## Chips Available\n");
    for chip in &ctx.chips_available {
        prompt.push_str(&format!("- {}\n", chip.display_str().to_uppercase()));
    }
    if !ctx.chips_used.is_empty() {
        let used = ctx
            .chips_used
            .iter()
            .map(Chip::display_str)
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("\nChips already used: {used}\n"));
    }
    prompt.push('\n');

    // Section 6: chip strategy guide
    prompt.push_str(
        "## Chip Strategy Guide\n\
         - WILDCARD: Best used when team needs 4+ transfers, or before a good fixture run. Save one for late season.\n\
         - FREE HIT: Best for blank gameweeks (when many teams don't play) - build a one-week team.\n\
         - BENCH BOOST: Best for double gameweeks when your bench has good fixtures too.\n\
         - TRIPLE CAPTAIN: Best for a double gameweek with a premium captain playing twice, or exceptional single GW fixture.\n\n",
    );

    // Section 7: constraints
    prompt.push_str(&format!(
        "## Constraints\n\
         - Free transfers available: {} (use them or lose them - they cap at 5!)\n\
         - Max point hits allowed: {} (each extra transfer beyond free costs -4 points)\n\
         - Must maintain valid squad: 2 GKP, 5 DEF, 5 MID, 3 FWD\n\
         - Max 3 players from same team\n\
         - Transfers must be within budget\n\n",
        ctx.free_transfers, ctx.max_penalty,
    ));

    // Section 8: transfer strategy
    prompt.push_str(&format!(
        "## Transfer Strategy\n\
         With {ft} free transfers available, consider making multiple moves if beneficial.\n\
         Don't waste free transfers - banked transfers cap at 5.\n\
         Recommend UP TO {ft} transfers if there are clear improvements to be made.\n\n",
        ft = ctx.free_transfers,
    ));

    // Section 9: task and reply schema
    prompt.push_str(
        "## Task\n\
         Analyze the team and provide recommendations in this exact JSON format:\n\
         {\n\
           \"transfers\": [\n\
             {\"playerOut\": <id>, \"playerOutName\": \"<name>\", \"playerIn\": <id>, \"playerInName\": \"<name>\", \"reason\": \"<brief reason>\"}\n\
           ],\n\
           \"captain\": {\"id\": <id>, \"name\": \"<name>\", \"reason\": \"<brief reason>\"},\n\
           \"viceCaptain\": {\"id\": <id>, \"name\": \"<name>\", \"reason\": \"<brief reason>\"},\n\
           \"chipAdvice\": {\n\
             \"useThisWeek\": null | \"wildcard\" | \"freehit\" | \"benchboost\" | \"triplecaptain\",\n\
             \"reasoning\": \"<why or why not to use a chip this week>\",\n\
             \"futureStrategy\": \"<brief advice on when to use remaining chips>\"\n\
           },\n\
           \"confidence\": \"high\" | \"medium\" | \"low\",\n\
           \"summary\": \"<2-3 sentence summary of your analysis>\",\n\
           \"keyInsights\": [\"<insight 1>\", \"<insight 2>\", \"<insight 3>\"]\n\
         }\n\
         \n\
         If no transfers are recommended, use an empty array for transfers.\n\
         If no chip should be used this week, set useThisWeek to null.",
    );

    prompt
}
