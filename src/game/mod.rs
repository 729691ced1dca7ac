//! Match core modules

pub mod coordinator;
pub mod phase;
pub mod roster;
pub mod team;
pub mod victory;
pub mod zone;

pub use coordinator::{MatchCoordinator, MatchRules};
pub use phase::MatchPhase;
pub use roster::Roster;
pub use zone::{ZoneController, ZoneSchedule};
