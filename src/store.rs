// Storage capabilities injected into the engine.
//
// The reasoning feed and decision store are modeled as traits so runs are
// testable in isolation with the in-memory implementation below; the SQLite
// `Database` implements the same pair for production use.

use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;

use crate::model::{
    DecisionRecord, EventCategory, Recommendation, ReasoningEvent,
};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Append-only reasoning feed, scoped by gameweek with a clear-then-append
/// protocol per analysis run.
pub trait ReasoningStore: Send + Sync {
    /// Append one event. `gameweek = None` marks a global event that shows
    /// up in every gameweek's feed.
    fn append(
        &self,
        gameweek: Option<u32>,
        message: &str,
        category: EventCategory,
    ) -> Result<()>;

    /// Remove all events recorded for `gameweek`. Global events survive.
    fn clear_for(&self, gameweek: u32) -> Result<()>;

    /// Events for `gameweek` plus global events, newest first, capped at
    /// `limit`.
    fn query(&self, gameweek: u32, limit: usize) -> Result<Vec<ReasoningEvent>>;
}

/// Persisted recommendation snapshots.
pub trait DecisionStore: Send + Sync {
    /// Append a new decision record; returns its id.
    fn insert_decision(&self, gameweek: u32, recommendation: &Recommendation) -> Result<i64>;

    /// The most recent decision for `gameweek`, or `None` when no run has
    /// been recorded yet.
    fn latest_decision(&self, gameweek: u32) -> Result<Option<DecisionRecord>>;

    /// Most recent decisions across all gameweeks, newest first.
    fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>>;

    /// Flag a decision as acted upon by a collaborator.
    fn mark_executed(&self, decision_id: i64) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    events: Vec<ReasoningEvent>,
    decisions: Vec<DecisionRecord>,
    next_event_id: i64,
    next_decision_id: i64,
}

/// In-memory store used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    /// All events in insertion order, for assertions on emitted sequences.
    pub fn events_in_order(&self, gameweek: u32) -> Vec<ReasoningEvent> {
        self.inner()
            .events
            .iter()
            .filter(|e| e.gameweek.is_none() || e.gameweek == Some(gameweek))
            .cloned()
            .collect()
    }
}

impl ReasoningStore for MemoryStore {
    fn append(
        &self,
        gameweek: Option<u32>,
        message: &str,
        category: EventCategory,
    ) -> Result<()> {
        let mut inner = self.inner();
        inner.next_event_id += 1;
        let id = inner.next_event_id;
        inner.events.push(ReasoningEvent {
            id,
            gameweek,
            message: message.to_string(),
            category,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn clear_for(&self, gameweek: u32) -> Result<()> {
        self.inner()
            .events
            .retain(|e| e.gameweek != Some(gameweek));
        Ok(())
    }

    fn query(&self, gameweek: u32, limit: usize) -> Result<Vec<ReasoningEvent>> {
        let inner = self.inner();
        let mut matching: Vec<ReasoningEvent> = inner
            .events
            .iter()
            .filter(|e| e.gameweek.is_none() || e.gameweek == Some(gameweek))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        matching.truncate(limit);
        Ok(matching)
    }
}

impl DecisionStore for MemoryStore {
    fn insert_decision(&self, gameweek: u32, recommendation: &Recommendation) -> Result<i64> {
        let transfers = serde_json::to_string(&recommendation.transfers)?;
        let mut inner = self.inner();
        inner.next_decision_id += 1;
        let id = inner.next_decision_id;
        inner.decisions.push(DecisionRecord {
            id,
            gameweek,
            transfers,
            captain: recommendation.captain.as_ref().map(|c| c.id),
            vice_captain: recommendation.vice_captain.as_ref().map(|c| c.id),
            reasoning: recommendation.summary.clone(),
            confidence: recommendation.confidence,
            executed: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn latest_decision(&self, gameweek: u32) -> Result<Option<DecisionRecord>> {
        Ok(self
            .inner()
            .decisions
            .iter()
            .filter(|d| d.gameweek == gameweek)
            .max_by_key(|d| d.id)
            .cloned())
    }

    fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let inner = self.inner();
        let mut all: Vec<DecisionRecord> = inner.decisions.clone();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all.truncate(limit);
        Ok(all)
    }

    fn mark_executed(&self, decision_id: i64) -> Result<()> {
        let mut inner = self.inner();
        if let Some(decision) = inner.decisions.iter_mut().find(|d| d.id == decision_id) {
            decision.executed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChipAdvice, Confidence};

    fn sample_recommendation(summary: &str) -> Recommendation {
        Recommendation {
            transfers: vec![],
            captain: None,
            vice_captain: None,
            chip_advice: ChipAdvice {
                use_this_week: None,
                reasoning: "hold".to_string(),
                future_strategy: "wait".to_string(),
            },
            confidence: Confidence::High,
            summary: summary.to_string(),
            key_insights: vec![],
        }
    }

    #[test]
    fn append_and_query_newest_first() {
        let store = MemoryStore::new();
        store.append(Some(5), "first", EventCategory::Start).unwrap();
        store.append(Some(5), "second", EventCategory::Info).unwrap();
        store.append(Some(6), "other gw", EventCategory::Info).unwrap();

        let events = store.query(5, 50).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "second");
        assert_eq!(events[1].message, "first");
    }

    #[test]
    fn query_includes_global_events() {
        let store = MemoryStore::new();
        store.append(None, "season note", EventCategory::Info).unwrap();
        store.append(Some(3), "gw event", EventCategory::Info).unwrap();

        let events = store.query(3, 50).unwrap();
        assert_eq!(events.len(), 2);

        // Global events also visible from another gameweek's feed.
        let events = store.query(9, 50).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "season note");
    }

    #[test]
    fn clear_for_only_touches_target_gameweek() {
        let store = MemoryStore::new();
        store.append(Some(3), "stale", EventCategory::Info).unwrap();
        store.append(Some(4), "keep", EventCategory::Info).unwrap();
        store.append(None, "global", EventCategory::Info).unwrap();

        store.clear_for(3).unwrap();

        assert_eq!(store.query(3, 50).unwrap().len(), 1); // global only
        assert_eq!(store.query(4, 50).unwrap().len(), 2);
    }

    #[test]
    fn query_respects_limit() {
        let store = MemoryStore::new();
        for i in 0..10 {
            store
                .append(Some(1), &format!("event {i}"), EventCategory::Info)
                .unwrap();
        }
        let events = store.query(1, 3).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message, "event 9");
    }

    #[test]
    fn latest_decision_returns_most_recent() {
        let store = MemoryStore::new();
        assert!(store.latest_decision(8).unwrap().is_none());

        store
            .insert_decision(8, &sample_recommendation("first run"))
            .unwrap();
        store
            .insert_decision(8, &sample_recommendation("second run"))
            .unwrap();

        let latest = store.latest_decision(8).unwrap().unwrap();
        assert_eq!(latest.reasoning, "second run");
    }

    #[test]
    fn recent_decisions_across_gameweeks() {
        let store = MemoryStore::new();
        store.insert_decision(1, &sample_recommendation("gw1")).unwrap();
        store.insert_decision(2, &sample_recommendation("gw2")).unwrap();
        store.insert_decision(3, &sample_recommendation("gw3")).unwrap();

        let recent = store.recent_decisions(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reasoning, "gw3");
        assert_eq!(recent[1].reasoning, "gw2");
    }

    #[test]
    fn mark_executed_sets_flag() {
        let store = MemoryStore::new();
        let id = store
            .insert_decision(4, &sample_recommendation("run"))
            .unwrap();
        assert!(!store.latest_decision(4).unwrap().unwrap().executed);

        store.mark_executed(id).unwrap();
        assert!(store.latest_decision(4).unwrap().unwrap().executed);
    }
}
