// Fixture facts from the season schedule.

use serde::{Deserialize, Serialize};

/// One scheduled match. Immutable; difficulty ratings are the upstream
/// 1-5 FDR scale (lower = easier) from each side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub gameweek: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub home_difficulty: u8,
    pub away_difficulty: u8,
}

impl Fixture {
    /// Difficulty, home flag, and opponent from `team`'s perspective, or
    /// `None` if the team is not involved in this fixture.
    pub fn side_for(&self, team: u32) -> Option<(u8, bool, u32)> {
        if team == self.home_team {
            Some((self.home_difficulty, true, self.away_team))
        } else if team == self.away_team {
            Some((self.away_difficulty, false, self.home_team))
        } else {
            None
        }
    }
}
