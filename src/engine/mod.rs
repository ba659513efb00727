// The decision engine: turns raw player/fixture/squad data into a recorded
// weekly recommendation.
//
// Pipeline per run: validate the context, clear the gameweek's reasoning
// feed, enrich the context (squad join, market pool, fixture analysis),
// hand it to the configured strategy, validate the result, and record it.
// Runs are serialized per gameweek so a second caller cannot wipe an
// in-flight run's feed mid-write.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::config::{Config, StrategyConfig, StrategyMode};
use crate::llm::client::LlmClient;
use crate::model::{
    squad::validate_squad, Chip, EventCategory, Fixture, Player, Recommendation,
    SquadMember, SquadSlot,
};
use crate::store::{DecisionStore, ReasoningStore};
use crate::strategy::{
    AnalysisContext, HeuristicStrategy, NarrativeStrategy, RecommendationStrategy,
};

pub mod candidates;
pub mod fixtures;
pub mod recorder;
pub mod transfers;

use fixtures::{build_profiles, detect_special_gameweeks, DETECTION_LOOKAHEAD, RANKING_WINDOW};
use recorder::DecisionRecorder;
use transfers::MAX_FREE_TRANSFERS;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Required context or configuration is missing/invalid. Fails fast and
    /// is never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external reasoning service failed or timed out. Recoverable only
    /// through the explicit heuristic-fallback policy.
    #[error("reasoning service unavailable: {0}")]
    Upstream(String),

    /// The reasoning service reply did not contain a valid recommendation.
    /// Always propagated: a malformed recommendation never reaches storage.
    #[error("failed to parse reasoning service reply: {0}")]
    Parse(String),

    /// A storage capability failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// EngineContext
// ---------------------------------------------------------------------------

/// Raw inputs for one recommendation run, gathered by the API collaborator
/// from the upstream sports-data client.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub squad: Vec<SquadSlot>,
    pub all_players: Vec<Player>,
    pub fixtures: Vec<Fixture>,
    /// Bank balance in £m.
    pub budget: f64,
    /// Free-transfer entitlement, pre-computed via
    /// [`transfers::compute_entitlement`] from the gameweek history.
    pub free_transfers: u8,
    pub gameweek: u32,
    /// Largest tolerated point penalty (<= 0).
    pub max_penalty: i32,
    pub chips_available: Vec<Chip>,
    pub chips_used: Vec<Chip>,
}

// ---------------------------------------------------------------------------
// Chip availability policy
// ---------------------------------------------------------------------------

/// Derive the available-chip set from the used list. Single-use chips
/// disappear once used; the wildcard allowance per season is policy
/// (`wildcards_per_season`, normally 2: one per half).
pub fn available_chips(used: &[Chip], wildcards_per_season: u8) -> Vec<Chip> {
    Chip::ALL
        .into_iter()
        .filter(|chip| {
            let used_count = used.iter().filter(|u| *u == chip).count();
            match chip {
                Chip::Wildcard => used_count < wildcards_per_season as usize,
                _ => used_count == 0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The decision engine. One instance serves all gameweeks; runs for the
/// same gameweek are serialized.
pub struct Engine {
    strategy: Box<dyn RecommendationStrategy>,
    /// Heuristic fallback for upstream failures, present only when the
    /// fallback policy is configured.
    fallback: Option<HeuristicStrategy>,
    reasoning: Arc<dyn ReasoningStore>,
    recorder: DecisionRecorder,
    market_min_form: f64,
    market_limit: usize,
    gw_locks: StdMutex<HashMap<u32, Arc<AsyncMutex<()>>>>,
}

impl Engine {
    pub fn new(
        strategy: Box<dyn RecommendationStrategy>,
        fallback: Option<HeuristicStrategy>,
        reasoning: Arc<dyn ReasoningStore>,
        decisions: Arc<dyn DecisionStore>,
        config: &StrategyConfig,
    ) -> Self {
        let recorder = DecisionRecorder::new(Arc::clone(&reasoning), decisions);
        Self {
            strategy,
            fallback,
            reasoning,
            recorder,
            market_min_form: config.market_min_form,
            market_limit: config.market_limit,
            gw_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Wire the engine from configuration: heuristic mode runs rule-based
    /// only; narrative mode talks to the reasoning service, optionally with
    /// the heuristic as fallback.
    pub fn from_config(
        config: &Config,
        reasoning: Arc<dyn ReasoningStore>,
        decisions: Arc<dyn DecisionStore>,
    ) -> Self {
        let (strategy, fallback): (Box<dyn RecommendationStrategy>, _) =
            match config.strategy.mode {
                StrategyMode::Heuristic => (
                    Box::new(HeuristicStrategy::from_config(&config.strategy)),
                    None,
                ),
                StrategyMode::Narrative => {
                    let client = Arc::new(LlmClient::from_config(config));
                    let fallback = config
                        .strategy
                        .fallback_to_heuristic
                        .then(|| HeuristicStrategy::from_config(&config.strategy));
                    (
                        Box::new(NarrativeStrategy::from_config(config, client)),
                        fallback,
                    )
                }
            };
        Self::new(strategy, fallback, reasoning, decisions, &config.strategy)
    }

    /// Query surface for the API collaborator.
    pub fn recorder(&self) -> &DecisionRecorder {
        &self.recorder
    }

    /// Produce, record, and return the recommendation for one gameweek.
    pub async fn produce_recommendation(
        &self,
        ctx: &EngineContext,
    ) -> Result<Recommendation, AdvisorError> {
        validate_context(ctx)?;
        let gw = ctx.gameweek;

        // Serialize runs per gameweek: a concurrent second run's clear must
        // not wipe an in-flight first run's partial feed.
        let lock = self.lock_for(gw);
        let _guard = lock.lock().await;

        info!(gameweek = gw, "starting recommendation run");
        self.reasoning.clear_for(gw)?;

        match self.run(ctx).await {
            Ok(recommendation) => Ok(recommendation),
            Err(error) => {
                // Prior events stay in the feed; close it with one
                // error-tagged entry.
                let _ = self.reasoning.append(
                    Some(gw),
                    &format!("Error during analysis: {error}"),
                    EventCategory::Error,
                );
                Err(error)
            }
        }
    }

    /// The body of one run, after validation and log clearing.
    async fn run(&self, ctx: &EngineContext) -> Result<Recommendation, AdvisorError> {
        let gw = ctx.gameweek;
        let log = &*self.reasoning;

        log.append(Some(gw), "Starting team analysis...", EventCategory::Start)?;
        log.append(
            Some(gw),
            &format!(
                "Current budget: £{:.1}m, Free transfers: {}",
                ctx.budget, ctx.free_transfers
            ),
            EventCategory::Info,
        )?;

        let analysis = self.build_analysis_context(ctx);

        let injured: Vec<&SquadMember> = analysis
            .squad
            .iter()
            .filter(|m| m.player.has_injury_concern())
            .collect();
        if !injured.is_empty() {
            log.append(
                Some(gw),
                &format!("Found {} player(s) with injury concerns", injured.len()),
                EventCategory::Warning,
            )?;
            for member in &injured {
                let note = if member.player.news.is_empty() {
                    format!(
                        "Chance of playing: {}%",
                        member.player.chance_of_playing.unwrap_or(0)
                    )
                } else {
                    member.player.news.clone()
                };
                log.append(
                    Some(gw),
                    &format!("{}: {note}", member.player.name),
                    EventCategory::Warning,
                )?;
            }
        }

        log.append(
            Some(gw),
            "Analyzing player form and fixture difficulty...",
            EventCategory::Thinking,
        )?;

        let recommendation = match self.strategy.recommend(&analysis, log).await {
            Ok(recommendation) => recommendation,
            Err(AdvisorError::Upstream(message)) => match &self.fallback {
                Some(fallback) => {
                    warn!(gameweek = gw, %message, "falling back to heuristic strategy");
                    log.append(
                        Some(gw),
                        &format!(
                            "Reasoning service unavailable ({message}) - falling back \
                             to heuristic analysis"
                        ),
                        EventCategory::Warning,
                    )?;
                    fallback.recommend(&analysis, log).await?
                }
                None => return Err(AdvisorError::Upstream(message)),
            },
            Err(error) => return Err(error),
        };

        recommendation.validate().map_err(AdvisorError::Parse)?;
        self.recorder.record(gw, &recommendation)?;
        Ok(recommendation)
    }

    /// Join squad slots to player records and run the leaf analyzers.
    fn build_analysis_context(&self, ctx: &EngineContext) -> AnalysisContext {
        let by_id: HashMap<u32, &Player> =
            ctx.all_players.iter().map(|p| (p.id, p)).collect();

        let squad: Vec<SquadMember> = ctx
            .squad
            .iter()
            .filter_map(|slot| match by_id.get(&slot.player_id) {
                Some(player) => Some(SquadMember {
                    slot: *slot,
                    player: (*player).clone(),
                }),
                None => {
                    warn!(player_id = slot.player_id, "squad slot references unknown player");
                    None
                }
            })
            .collect();

        let squad_ids: HashSet<u32> = ctx.squad.iter().map(|s| s.player_id).collect();
        let market = candidates::select_market(
            &ctx.all_players,
            &squad_ids,
            self.market_min_form,
            self.market_limit,
        );

        AnalysisContext {
            gameweek: ctx.gameweek,
            budget: ctx.budget,
            free_transfers: ctx.free_transfers,
            max_penalty: ctx.max_penalty,
            squad,
            market,
            profiles: build_profiles(&ctx.fixtures, ctx.gameweek, RANKING_WINDOW),
            special_gameweeks: detect_special_gameweeks(
                &ctx.fixtures,
                ctx.gameweek,
                DETECTION_LOOKAHEAD,
            ),
            chips_available: ctx.chips_available.clone(),
            chips_used: ctx.chips_used.clone(),
        }
    }

    fn lock_for(&self, gameweek: u32) -> Arc<AsyncMutex<()>> {
        let mut locks = self.gw_locks.lock().expect("gameweek lock map poisoned");
        Arc::clone(locks.entry(gameweek).or_default())
    }
}

// ---------------------------------------------------------------------------
// Context validation
// ---------------------------------------------------------------------------

fn validate_context(ctx: &EngineContext) -> Result<(), AdvisorError> {
    if ctx.gameweek == 0 {
        return Err(AdvisorError::Configuration(
            "gameweek must be at least 1".to_string(),
        ));
    }
    if ctx.free_transfers == 0 || ctx.free_transfers > MAX_FREE_TRANSFERS {
        return Err(AdvisorError::Configuration(format!(
            "free transfers must be in 1-{MAX_FREE_TRANSFERS}, got {}",
            ctx.free_transfers
        )));
    }
    if ctx.budget < 0.0 {
        return Err(AdvisorError::Configuration(format!(
            "budget must not be negative, got {}",
            ctx.budget
        )));
    }
    if ctx.max_penalty > 0 {
        return Err(AdvisorError::Configuration(format!(
            "max penalty must be <= 0, got {}",
            ctx.max_penalty
        )));
    }
    validate_squad(&ctx.squad).map_err(AdvisorError::Configuration)?;
    Ok(())
}
