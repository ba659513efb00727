// Domain types shared across the engine.

pub mod fixture;
pub mod player;
pub mod recommendation;
pub mod squad;

pub use fixture::Fixture;
pub use player::{Availability, Player, Position};
pub use recommendation::{
    CaptainPick, Chip, ChipAdvice, Confidence, DecisionRecord, EventCategory,
    Recommendation, ReasoningEvent, TransferProposal,
};
pub use squad::{GameweekHistoryEntry, SquadMember, SquadSlot};
