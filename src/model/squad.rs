// Squad slots, captaincy invariants, and transfer history entries.

use serde::{Deserialize, Serialize};

use crate::model::player::Player;

/// Roster slots 1-11 are the starting eleven; 12-15 are the bench.
pub const STARTING_SLOTS: u8 = 11;
/// Total roster slots in a squad.
pub const SQUAD_SIZE: u8 = 15;

// ---------------------------------------------------------------------------
// SquadSlot
// ---------------------------------------------------------------------------

/// One roster position paired with the player occupying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadSlot {
    /// 1-15; 1-11 = starting, 12-15 = bench.
    pub position_index: u8,
    pub player_id: u32,
    pub is_captain: bool,
    pub is_vice_captain: bool,
}

impl SquadSlot {
    pub fn is_starting(&self) -> bool {
        (1..=STARTING_SLOTS).contains(&self.position_index)
    }
}

/// Check the squad-level captaincy invariants: at most one captain, at most
/// one vice-captain, and the two must be distinct players when both are set.
/// Slot indices must lie within 1-15.
pub fn validate_squad(slots: &[SquadSlot]) -> Result<(), String> {
    let mut captain: Option<u32> = None;
    let mut vice: Option<u32> = None;

    for slot in slots {
        if slot.position_index == 0 || slot.position_index > SQUAD_SIZE {
            return Err(format!(
                "slot index {} out of range 1-{SQUAD_SIZE}",
                slot.position_index
            ));
        }
        if slot.is_captain {
            if captain.is_some() {
                return Err("more than one captain designated".to_string());
            }
            captain = Some(slot.player_id);
        }
        if slot.is_vice_captain {
            if vice.is_some() {
                return Err("more than one vice-captain designated".to_string());
            }
            vice = Some(slot.player_id);
        }
    }

    if let (Some(c), Some(v)) = (captain, vice) {
        if c == v {
            return Err(format!(
                "captain and vice-captain are the same player ({c})"
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// SquadMember
// ---------------------------------------------------------------------------

/// A squad slot joined to its full player record. Built by the engine from
/// the raw context before strategies run.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadMember {
    pub slot: SquadSlot,
    pub player: Player,
}

// ---------------------------------------------------------------------------
// GameweekHistoryEntry
// ---------------------------------------------------------------------------

/// One past gameweek's transfer activity, as reported by the upstream
/// client. Used only to derive the free-transfer entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameweekHistoryEntry {
    pub transfers_made: u32,
    /// Whether a point penalty was incurred that gameweek.
    pub took_hit: bool,
}
