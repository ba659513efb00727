// Recommendation strategies.
//
// Both variants implement one capability: produce a recommendation from the
// enriched analysis context. Which one runs is decided by configuration at
// engine construction, not by branching inside the pipeline.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::fixtures::{FixtureEntry, SpecialGameweek};
use crate::engine::AdvisorError;
use crate::model::{Chip, Player, Recommendation, SquadMember};
use crate::store::ReasoningStore;

pub mod heuristic;
pub mod narrative;

pub use heuristic::HeuristicStrategy;
pub use narrative::NarrativeStrategy;

/// The enriched context a strategy works from. Built by the engine from the
/// raw request: squad slots joined to player records, the market pool
/// already selected, and fixture analysis already run.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub gameweek: u32,
    /// Bank balance in £m.
    pub budget: f64,
    pub free_transfers: u8,
    /// Largest tolerated point penalty (<= 0).
    pub max_penalty: i32,
    pub squad: Vec<SquadMember>,
    pub market: Vec<Player>,
    pub profiles: HashMap<u32, Vec<FixtureEntry>>,
    pub special_gameweeks: Vec<SpecialGameweek>,
    pub chips_available: Vec<Chip>,
    pub chips_used: Vec<Chip>,
}

/// Produce a weekly recommendation, narrating progress through the
/// reasoning store. Emitted event order is part of the contract: consumers
/// render events in arrival order.
#[async_trait]
pub trait RecommendationStrategy: Send + Sync {
    async fn recommend(
        &self,
        ctx: &AnalysisContext,
        log: &dyn ReasoningStore,
    ) -> Result<Recommendation, AdvisorError>;
}
