//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::phase::MatchPhase;

/// Match modes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeId {
    /// Every player for themselves
    Solo,
    /// Teams of two
    Duos,
    /// Teams of three
    Trios,
}

impl Default for ModeId {
    fn default() -> Self {
        Self::Solo
    }
}

/// Planar (ground-plane) position; height is irrelevant to the zone
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Planar distance to another position
    pub fn distance_to(&self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Zone (shrinking safe region) state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneState {
    /// Current shrink phase (0 = inactive, 1-based while running)
    pub phase: u32,
    /// Current zone radius
    pub radius: f32,
    /// Current zone center
    pub center: Position,
    /// Target radius (shrinking towards)
    pub target_radius: f32,
    /// Target zone center
    pub target_center: Position,
    /// Damage applied per damage tick to players outside the zone
    pub damage_per_tick: f32,
    /// Whether the zone is running
    pub active: bool,
}

impl ZoneState {
    pub fn inactive(radius: f32, center: Position) -> Self {
        Self {
            phase: 0,
            radius,
            center,
            target_radius: radius,
            target_center: center,
            damage_per_tick: 0.0,
            active: false,
        }
    }
}

/// Match winner: a lone survivor in solo, a surviving squad otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Winner {
    Player { id: Uuid },
    Team { key: u32 },
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Player-reported planar position (trusted at this layer)
    Position { x: f32, z: f32 },

    /// Request a mode change (only honored in the lobby)
    SetMode { mode: ModeId },

    /// Leave the match
    Leave,
}

/// Messages broadcast from server to all connected observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection (sent to the new socket only)
    Welcome { player_id: Uuid, server_time: u64 },

    /// Match phase transition
    PhaseChanged { new: MatchPhase, old: MatchPhase },

    /// Lobby roster status, sent every driver tick while in the lobby
    LobbyStatus {
        current: usize,
        required: usize,
        time_remaining: f32,
        can_start: bool,
    },

    /// Pre-drop countdown tick
    Countdown { seconds_remaining: u32 },

    /// Alive players/teams, sent every driver tick during the match
    AliveCountUpdate { players: usize, teams: usize },

    /// Upcoming zone shrink warning
    ZoneWarning { delay_seconds: u32, upcoming_phase: u32 },

    /// Zone shrink phase started
    ZoneUpdate {
        phase: u32,
        target_radius: f32,
        target_center: Position,
        damage: f32,
    },

    /// Zone damage applied to a player outside the safe region
    ZoneDamage { player_id: Uuid, amount: f32 },

    /// A winner has been determined
    VictoryDeclared { winner: Winner },

    /// Player eliminated (killer absent for environmental deaths)
    PlayerEliminated {
        victim_id: Uuid,
        killer_id: Option<Uuid>,
    },
}
