// The engine's output contract and the records the recorder persists.
//
// Serialization uses the camelCase JSON schema the API collaborator renders
// and the reasoning service is instructed to reply in, so one serde model
// covers both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chips
// ---------------------------------------------------------------------------

/// A one-time special action altering transfer/scoring rules for one
/// gameweek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chip {
    #[serde(rename = "wildcard")]
    Wildcard,
    #[serde(rename = "freehit")]
    FreeHit,
    #[serde(rename = "benchboost")]
    BenchBoost,
    #[serde(rename = "triplecaptain")]
    TripleCaptain,
}

impl Chip {
    pub const ALL: [Chip; 4] = [
        Chip::Wildcard,
        Chip::FreeHit,
        Chip::BenchBoost,
        Chip::TripleCaptain,
    ];

    pub fn display_str(&self) -> &'static str {
        match self {
            Chip::Wildcard => "Wildcard",
            Chip::FreeHit => "Free Hit",
            Chip::BenchBoost => "Bench Boost",
            Chip::TripleCaptain => "Triple Captain",
        }
    }
}

/// Chip advice for the current gameweek plus forward-looking strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipAdvice {
    /// `None` means hold all chips this week.
    pub use_this_week: Option<Chip>,
    pub reasoning: String,
    pub future_strategy: String,
}

// ---------------------------------------------------------------------------
// Transfers and captaincy
// ---------------------------------------------------------------------------

/// One proposed squad change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProposal {
    pub player_out: u32,
    pub player_out_name: String,
    pub player_in: u32,
    pub player_in_name: String,
    pub reason: String,
}

/// A captain or vice-captain pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptainPick {
    pub id: u32,
    pub name: String,
    pub reason: String,
}

/// How strongly the strategy stands behind its recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// The engine's complete weekly recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default)]
    pub transfers: Vec<TransferProposal>,
    #[serde(default)]
    pub captain: Option<CaptainPick>,
    #[serde(default)]
    pub vice_captain: Option<CaptainPick>,
    pub chip_advice: ChipAdvice,
    pub confidence: Confidence,
    pub summary: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
}

impl Recommendation {
    /// Check the output invariant: captain and vice-captain, when both
    /// present, must reference different players.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(captain), Some(vice)) = (&self.captain, &self.vice_captain) {
            if captain.id == vice.id {
                return Err(format!(
                    "captain and vice-captain reference the same player ({})",
                    captain.id
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reasoning events
// ---------------------------------------------------------------------------

/// Category tag rendered by the reasoning feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Start,
    Thinking,
    Info,
    Warning,
    Insight,
    Success,
    Captain,
    Transfer,
    Error,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Start => "start",
            EventCategory::Thinking => "thinking",
            EventCategory::Info => "info",
            EventCategory::Warning => "warning",
            EventCategory::Insight => "insight",
            EventCategory::Success => "success",
            EventCategory::Captain => "captain",
            EventCategory::Transfer => "transfer",
            EventCategory::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "start" => Some(EventCategory::Start),
            "thinking" => Some(EventCategory::Thinking),
            "info" => Some(EventCategory::Info),
            "warning" => Some(EventCategory::Warning),
            "insight" => Some(EventCategory::Insight),
            "success" => Some(EventCategory::Success),
            "captain" => Some(EventCategory::Captain),
            "transfer" => Some(EventCategory::Transfer),
            "error" => Some(EventCategory::Error),
            _ => None,
        }
    }
}

/// One line of the append-only reasoning feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningEvent {
    pub id: i64,
    /// `None` marks a global event visible from every gameweek's feed.
    pub gameweek: Option<u32>,
    pub message: String,
    pub category: EventCategory,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Decision records
// ---------------------------------------------------------------------------

/// Persisted snapshot of one recommendation. Created once per successful
/// run and never mutated, except for the `executed` flag a collaborator
/// sets after acting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: i64,
    pub gameweek: u32,
    /// JSON-encoded `Vec<TransferProposal>`.
    pub transfers: String,
    pub captain: Option<u32>,
    pub vice_captain: Option<u32>,
    /// The recommendation's summary text.
    pub reasoning: String,
    pub confidence: Confidence,
    pub executed: bool,
    pub created_at: DateTime<Utc>,
}

impl DecisionRecord {
    /// Decode the stored transfer proposals.
    pub fn transfer_proposals(&self) -> Result<Vec<TransferProposal>, serde_json::Error> {
        serde_json::from_str(&self.transfers)
    }
}
