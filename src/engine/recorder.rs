// Persists the chosen recommendation and writes the closing stretch of the
// reasoning feed.

use std::sync::Arc;

use tracing::info;

use crate::engine::AdvisorError;
use crate::model::{DecisionRecord, EventCategory, Recommendation, ReasoningEvent};
use crate::store::{DecisionStore, ReasoningStore};

/// Wraps the two storage capabilities behind the record/query protocol.
/// The engine clears the gameweek's log at the start of a run; the recorder
/// appends the closing events and the decision snapshot at the end.
pub struct DecisionRecorder {
    reasoning: Arc<dyn ReasoningStore>,
    decisions: Arc<dyn DecisionStore>,
}

impl DecisionRecorder {
    pub fn new(reasoning: Arc<dyn ReasoningStore>, decisions: Arc<dyn DecisionStore>) -> Self {
        Self {
            reasoning,
            decisions,
        }
    }

    /// Append the completion marker, one event per key insight and transfer,
    /// the captaincy events, and finally persist the decision snapshot.
    /// Returns the new decision's id.
    pub fn record(
        &self,
        gameweek: u32,
        recommendation: &Recommendation,
    ) -> Result<i64, AdvisorError> {
        let log = &*self.reasoning;

        log.append(Some(gameweek), "Analysis complete!", EventCategory::Success)?;

        for insight in &recommendation.key_insights {
            log.append(Some(gameweek), insight, EventCategory::Insight)?;
        }

        if recommendation.transfers.is_empty() {
            log.append(
                Some(gameweek),
                "No transfers recommended - team looks solid!",
                EventCategory::Success,
            )?;
        } else {
            for transfer in &recommendation.transfers {
                log.append(
                    Some(gameweek),
                    &format!(
                        "Transfer: {} -> {}",
                        transfer.player_out_name, transfer.player_in_name
                    ),
                    EventCategory::Transfer,
                )?;
                log.append(
                    Some(gameweek),
                    &format!("Reason: {}", transfer.reason),
                    EventCategory::Info,
                )?;
            }
        }

        if let Some(captain) = &recommendation.captain {
            log.append(
                Some(gameweek),
                &format!("Captain: {} - {}", captain.name, captain.reason),
                EventCategory::Captain,
            )?;
        }
        if let Some(vice) = &recommendation.vice_captain {
            log.append(
                Some(gameweek),
                &format!("Vice-captain: {} - {}", vice.name, vice.reason),
                EventCategory::Info,
            )?;
        }

        let id = self.decisions.insert_decision(gameweek, recommendation)?;
        info!(gameweek, decision_id = id, "decision recorded");
        Ok(id)
    }

    /// The latest decision recorded for `gameweek`, if any run has finished.
    pub fn latest_decision(&self, gameweek: u32) -> Result<Option<DecisionRecord>, AdvisorError> {
        Ok(self.decisions.latest_decision(gameweek)?)
    }

    /// Recent decisions across all gameweeks, newest first.
    pub fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, AdvisorError> {
        Ok(self.decisions.recent_decisions(limit)?)
    }

    /// Flag a decision as executed by a collaborator.
    pub fn mark_executed(&self, decision_id: i64) -> Result<(), AdvisorError> {
        Ok(self.decisions.mark_executed(decision_id)?)
    }

    /// The reasoning feed for `gameweek` (plus global events), newest first.
    pub fn reasoning_log(
        &self,
        gameweek: u32,
        limit: usize,
    ) -> Result<Vec<ReasoningEvent>, AdvisorError> {
        Ok(self.reasoning.query(gameweek, limit)?)
    }
}
