// Player records as supplied by the upstream sports-data collaborator.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Squad position of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GKP")]
    Gkp,
    #[serde(rename = "DEF")]
    Def,
    #[serde(rename = "MID")]
    Mid,
    #[serde(rename = "FWD")]
    Fwd,
}

impl Position {
    /// Map the upstream numeric element type (1-4) to a position.
    /// Returns `None` for codes outside the known range.
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Position::Gkp),
            2 => Some(Position::Def),
            3 => Some(Position::Mid),
            4 => Some(Position::Fwd),
            _ => None,
        }
    }

    /// Short display label.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Gkp => "GKP",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Selection availability derived from the upstream status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Doubtful,
    Unavailable,
    Other,
}

impl Availability {
    /// Map the upstream single-letter status code. `a` = available,
    /// `d` = doubtful; injured, suspended, and unavailable codes all
    /// collapse into `Unavailable`.
    pub fn from_status_code(code: &str) -> Self {
        match code {
            "a" => Availability::Available,
            "d" => Availability::Doubtful,
            "i" | "s" | "u" | "n" => Availability::Unavailable,
            _ => Availability::Other,
        }
    }

    /// Whether the player can be considered for transfer targets.
    pub fn is_selectable(&self) -> bool {
        matches!(self, Availability::Available | Availability::Doubtful)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player record. Read-only from the engine's perspective; the upstream
/// client owns fetching and refreshing these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    /// Club short name, e.g. "ARS".
    pub team: String,
    pub team_id: u32,
    pub position: Position,
    /// Price in £m with one decimal place of precision (e.g. 8.5).
    pub price: f64,
    /// Short-window rolling performance metric. 0.0 when the upstream has
    /// no form data, which sorts last among real (non-negative) forms.
    pub form: f64,
    pub total_points: i32,
    pub status: Availability,
    /// Free-text injury/news note; empty when there is none.
    #[serde(default)]
    pub news: String,
    /// Chance of playing next round as a percentage, when published.
    #[serde(default)]
    pub chance_of_playing: Option<u8>,
    /// Expected goal involvements over the season to date.
    #[serde(default)]
    pub expected_goal_involvements: f64,
}

impl Player {
    /// Whether the player carries an injury concern worth flagging: either
    /// a news note or a published chance of playing below 75%.
    pub fn has_injury_concern(&self) -> bool {
        !self.news.is_empty() || self.chance_of_playing.is_some_and(|c| c < 75)
    }
}
