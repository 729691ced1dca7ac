//! Match phase cycle

use serde::{Deserialize, Serialize};

/// Match lifecycle phase
///
/// Transitions are a strict cyclic total order; `next()` is the only way a
/// phase ever changes, so no phase can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for enough players
    Lobby,
    /// Teams formed, pre-drop countdown running
    Starting,
    /// Players placed, drop animation window
    Dropping,
    /// Match in progress, zone running
    Match,
    /// Results display
    Ending,
    /// Per-match state reset and intermission
    Cleanup,
}

impl MatchPhase {
    /// The exact adjacent successor (Cleanup wraps back to Lobby)
    pub fn next(self) -> Self {
        match self {
            Self::Lobby => Self::Starting,
            Self::Starting => Self::Dropping,
            Self::Dropping => Self::Match,
            Self::Match => Self::Ending,
            Self::Ending => Self::Cleanup,
            Self::Cleanup => Self::Lobby,
        }
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lobby => "lobby",
            Self::Starting => "starting",
            Self::Dropping => "dropping",
            Self::Match => "match",
            Self::Ending => "ending",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_every_phase_in_order() {
        let expected = [
            MatchPhase::Lobby,
            MatchPhase::Starting,
            MatchPhase::Dropping,
            MatchPhase::Match,
            MatchPhase::Ending,
            MatchPhase::Cleanup,
        ];

        let mut phase = MatchPhase::Lobby;
        for want in expected {
            assert_eq!(phase, want);
            phase = phase.next();
        }
        // Cleanup closes the loop
        assert_eq!(phase, MatchPhase::Lobby);
    }
}
