// Deterministic rule-based recommendation strategy.
//
// Captaincy goes to the best in-form squad members, weak links are paired
// against clearly better market candidates position-for-position, and chip
// advice stays on hold (special-gameweek detection is surfaced, but picking
// the right chip is left to the narrative strategy).

use async_trait::async_trait;

use crate::config::StrategyConfig;
use crate::engine::candidates::select_weak_links;
use crate::engine::AdvisorError;
use crate::model::{
    CaptainPick, ChipAdvice, Confidence, EventCategory, Recommendation,
    SquadMember, TransferProposal,
};
use crate::store::ReasoningStore;
use crate::strategy::{AnalysisContext, RecommendationStrategy};

/// Rule-based strategy with no external dependencies. Identical inputs
/// produce byte-identical output.
#[derive(Debug, Clone)]
pub struct HeuristicStrategy {
    /// Squad members below this form are transfer-out candidates.
    weak_form_threshold: f64,
    /// A replacement must beat the outgoing player's form by more than
    /// this margin, which avoids churn over marginal differences.
    form_margin: f64,
}

impl HeuristicStrategy {
    pub fn new(weak_form_threshold: f64, form_margin: f64) -> Self {
        Self {
            weak_form_threshold,
            form_margin,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.weak_form_threshold, config.form_margin)
    }

    /// Squad sorted by form, best first. Stable: first-seen order wins
    /// ties, and players with no form data (form 0.0) end up last.
    fn sorted_by_form(squad: &[SquadMember]) -> Vec<&SquadMember> {
        let mut sorted: Vec<&SquadMember> = squad.iter().collect();
        sorted.sort_by(|a, b| {
            b.player
                .form
                .partial_cmp(&a.player.form)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Pair weak links against market candidates in weakness order. Each
    /// outgoing player and each candidate is used at most once; never more
    /// proposals than there are free transfers.
    fn propose_transfers(
        &self,
        ctx: &AnalysisContext,
        weak_links: &[SquadMember],
        log: &dyn ReasoningStore,
    ) -> Result<Vec<TransferProposal>, AdvisorError> {
        let gw = ctx.gameweek;
        let mut proposals = Vec::new();
        let mut used_targets = std::collections::HashSet::new();
        let mut used_outgoing = std::collections::HashSet::new();

        for weak in weak_links {
            if proposals.len() >= ctx.free_transfers as usize {
                break;
            }
            let out = &weak.player;
            if !used_outgoing.insert(out.id) {
                continue;
            }

            let replacement = ctx.market.iter().find(|candidate| {
                candidate.position == out.position
                    && !used_targets.contains(&candidate.id)
                    && candidate.form > out.form + self.form_margin
            });

            let Some(target) = replacement else {
                continue;
            };

            log.append(
                Some(gw),
                &format!(
                    "Identified {} (form: {}) as potential transfer out",
                    out.name, out.form
                ),
                EventCategory::Warning,
            )?;
            log.append(
                Some(gw),
                &format!(
                    "{} has excellent form ({}) and good fixtures",
                    target.name, target.form
                ),
                EventCategory::Insight,
            )?;

            proposals.push(TransferProposal {
                player_out: out.id,
                player_out_name: out.name.clone(),
                player_in: target.id,
                player_in_name: target.name.clone(),
                reason: format!(
                    "{} has poor form ({}). {} offers better value with form of {} \
                     and favorable upcoming fixtures.",
                    out.name, out.form, target.name, target.form
                ),
            });
            used_targets.insert(target.id);
        }

        Ok(proposals)
    }

    /// Chip advice: hold. When blanks or doubles were detected they are
    /// named in the reasoning, but choosing which chip fits is the
    /// narrative strategy's refinement.
    fn chip_advice(ctx: &AnalysisContext) -> ChipAdvice {
        let reasoning = if ctx.special_gameweeks.is_empty() {
            "No blank or double gameweeks detected. Save chips for better \
             opportunities - typically around GW18-19 and GW25-30 when fixture \
             congestion causes blanks/doubles."
                .to_string()
        } else {
            let summary = ctx
                .special_gameweeks
                .iter()
                .map(|s| {
                    format!(
                        "GW{}: {} doubles, {} blanks",
                        s.gameweek, s.teams_with_double, s.teams_blank
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            format!(
                "Special gameweeks ahead ({summary}). A chip could be valuable \
                 there - weigh which one fits before committing."
            )
        };

        ChipAdvice {
            use_this_week: None,
            reasoning,
            future_strategy: "Hold Wildcard for fixture swings, Free Hit for blank \
                              GWs, Bench Boost & Triple Captain for double GWs when \
                              your players have two games."
                .to_string(),
        }
    }
}

#[async_trait]
impl RecommendationStrategy for HeuristicStrategy {
    async fn recommend(
        &self,
        ctx: &AnalysisContext,
        log: &dyn ReasoningStore,
    ) -> Result<Recommendation, AdvisorError> {
        let gw = ctx.gameweek;

        log.append(
            Some(gw),
            &format!("Evaluating {} players in your squad...", ctx.squad.len()),
            EventCategory::Thinking,
        )?;
        log.append(
            Some(gw),
            &format!(
                "You have {} free transfer(s) available",
                ctx.free_transfers
            ),
            EventCategory::Info,
        )?;
        log.append(
            Some(gw),
            &format!(
                "Found {} high-form players not in your squad",
                ctx.market.len()
            ),
            EventCategory::Info,
        )?;

        let sorted = Self::sorted_by_form(&ctx.squad);
        let captain = sorted.first().map(|m| &m.player);
        let vice = captain.and_then(|c| {
            sorted
                .iter()
                .map(|m| &m.player)
                .find(|p| p.id != c.id)
        });

        let weak_links = select_weak_links(&ctx.squad, self.weak_form_threshold);
        let transfers = self.propose_transfers(ctx, &weak_links, log)?;

        if transfers.is_empty() {
            log.append(
                Some(gw),
                "No obvious transfer improvements found - squad looks solid",
                EventCategory::Success,
            )?;
        } else if transfers.len() < ctx.free_transfers as usize {
            log.append(
                Some(gw),
                &format!(
                    "Recommending {} of {} available transfers - quality over quantity",
                    transfers.len(),
                    ctx.free_transfers
                ),
                EventCategory::Info,
            )?;
        }

        let mut insights = Vec::new();

        // Injury watch.
        let injured: Vec<&SquadMember> = ctx
            .squad
            .iter()
            .filter(|m| !m.player.news.is_empty())
            .collect();
        if !injured.is_empty() {
            let names: Vec<&str> = injured.iter().map(|m| m.player.name.as_str()).collect();
            insights.push(format!(
                "Watch {} - injury concerns reported",
                names.join(", ")
            ));
            for member in &injured {
                log.append(
                    Some(gw),
                    &format!("{}: {}", member.player.name, member.player.news),
                    EventCategory::Warning,
                )?;
            }
        }

        // Top performers.
        let top_performers: Vec<&str> = sorted
            .iter()
            .take(3)
            .map(|m| m.player.name.as_str())
            .collect();
        if !top_performers.is_empty() {
            insights.push(format!("Your top performers: {}", top_performers.join(", ")));
            log.append(
                Some(gw),
                &format!("Top form in your squad: {}", top_performers.join(", ")),
                EventCategory::Insight,
            )?;
        }

        // Captaincy.
        if let Some(captain) = captain {
            log.append(
                Some(gw),
                &format!(
                    "Recommending {} as captain - highest form ({}) in squad",
                    captain.name, captain.form
                ),
                EventCategory::Captain,
            )?;
            insights.push(format!(
                "{} is the standout captain choice with {} form rating",
                captain.name, captain.form
            ));
        }

        // Chips.
        log.append(Some(gw), "Evaluating chip strategy...", EventCategory::Thinking)?;
        if ctx.special_gameweeks.is_empty() {
            log.append(
                Some(gw),
                "All chips in hand - saving them for optimal gameweeks",
                EventCategory::Insight,
            )?;
        } else {
            log.append(
                Some(gw),
                &format!(
                    "{} special gameweek(s) within range - chip opportunity ahead",
                    ctx.special_gameweeks.len()
                ),
                EventCategory::Insight,
            )?;
        }

        insights.truncate(3);

        let confidence = if transfers.is_empty() {
            Confidence::High
        } else {
            Confidence::Medium
        };

        let summary = match (transfers.len(), captain) {
            (0, Some(captain)) => format!(
                "Your squad is in good shape! No urgent transfers needed. {} \
                 remains the best captain option.",
                captain.name
            ),
            (0, None) => "Your squad is in good shape! No urgent transfers needed."
                .to_string(),
            (n, Some(captain)) => format!(
                "Found {n} recommended transfer(s) to improve your squad. {} is \
                 the top captain pick based on current form.",
                captain.name
            ),
            (n, None) => format!(
                "Found {n} recommended transfer(s) to improve your squad."
            ),
        };

        Ok(Recommendation {
            transfers,
            captain: captain.map(|p| CaptainPick {
                id: p.id,
                name: p.name.clone(),
                reason: format!(
                    "Best form in squad ({}) with {} total points this season",
                    p.form, p.total_points
                ),
            }),
            vice_captain: vice.map(|p| CaptainPick {
                id: p.id,
                name: p.name.clone(),
                reason: format!(
                    "Second highest form ({}) - reliable backup option",
                    p.form
                ),
            }),
            chip_advice: Self::chip_advice(ctx),
            confidence,
            summary,
            key_insights: insights,
        })
    }
}
