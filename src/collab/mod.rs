//! Collaborator interfaces
//!
//! External subsystems the match core depends on but does not own. Each is a
//! typed trait injected at construction; optional collaborators (dinosaurs,
//! loot, spawn points) may be absent, in which case the coordinator logs and
//! skips that single effect.

use std::f32::consts::TAU;
use std::sync::Arc;

use uuid::Uuid;

use crate::broadcast::Broadcast;
use crate::game::roster::Roster;
use crate::ws::protocol::{Position, ServerMsg};

/// Provides spawn geometry for drop placement and lobby return
pub trait SpawnPointProvider: Send + Sync {
    fn player_spawn_points(&self) -> Vec<Position>;
    fn map_center(&self) -> Position;
    fn map_size(&self) -> f32;
    fn lobby_spawn(&self) -> Option<Position>;
}

/// AI creature population control, driven at Match/Ending boundaries
pub trait DinoSpawnControl: Send + Sync {
    fn start_spawning(&self);
    fn stop_spawning(&self);
    fn despawn_all(&self);
}

/// Loot placement control, driven at Dropping/Cleanup boundaries
pub trait LootControl: Send + Sync {
    fn spawn_all_loot(&self);
    fn reset_loot(&self);
}

/// Current planar position and alive state per connected player
pub trait PlayerPositionSource: Send + Sync {
    /// Alive players with their last known positions (None = no active body)
    fn alive_positions(&self) -> Vec<(Uuid, Option<Position>)>;
}

/// Applies damage to a single player
pub trait DamageSink: Send + Sync {
    fn apply_damage(&self, player_id: Uuid, amount: f32);
}

/// Deterministic ring of drop positions, used when no spawn provider is wired
pub struct RingSpawnPoints {
    center: Position,
    map_size: f32,
}

/// Number of positions on the fallback ring
const RING_POINTS: usize = 16;

impl RingSpawnPoints {
    pub fn new(center: Position, map_size: f32) -> Self {
        Self { center, map_size }
    }
}

impl SpawnPointProvider for RingSpawnPoints {
    fn player_spawn_points(&self) -> Vec<Position> {
        // Ring at 70% of the map half-extent
        let radius = self.map_size * 0.35;
        (0..RING_POINTS)
            .map(|i| {
                let angle = TAU * i as f32 / RING_POINTS as f32;
                Position::new(
                    self.center.x + angle.cos() * radius,
                    self.center.z + angle.sin() * radius,
                )
            })
            .collect()
    }

    fn map_center(&self) -> Position {
        self.center
    }

    fn map_size(&self) -> f32 {
        self.map_size
    }

    fn lobby_spawn(&self) -> Option<Position> {
        Some(self.center)
    }
}

impl PlayerPositionSource for Roster {
    fn alive_positions(&self) -> Vec<(Uuid, Option<Position>)> {
        Roster::alive_positions(self)
    }
}

/// Roster-backed damage sink
///
/// Decrements health and, when a player dies to the environment, marks the
/// record dead and announces the elimination with no killer.
pub struct RosterDamage {
    roster: Arc<Roster>,
    broadcast: Arc<dyn Broadcast>,
}

impl RosterDamage {
    pub fn new(roster: Arc<Roster>, broadcast: Arc<dyn Broadcast>) -> Self {
        Self { roster, broadcast }
    }
}

impl DamageSink for RosterDamage {
    fn apply_damage(&self, player_id: Uuid, amount: f32) {
        let outcome = self.roster.apply_damage(player_id, amount);
        if outcome.died {
            tracing::info!(player_id = %player_id, "Player eliminated by the zone");
            self.broadcast.publish(ServerMsg::PlayerEliminated {
                victim_id: player_id,
                killer_id: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_positions_sit_on_the_ring() {
        let provider = RingSpawnPoints::new(Position::new(100.0, -50.0), 3000.0);
        let points = provider.player_spawn_points();

        assert_eq!(points.len(), RING_POINTS);
        for p in &points {
            let dist = p.distance_to(provider.map_center());
            assert!((dist - 1050.0).abs() < 0.5, "distance was {dist}");
        }
    }
}
