//! Connected-player roster (authoritative alive/health/position state)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::ws::protocol::Position;

use super::team::TeamKey;

/// Starting health per match
pub const MAX_HEALTH: f32 = 100.0;

/// Per-player record, owned by the roster for the connection lifetime
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: Uuid,
    pub display_name: String,
    pub alive: bool,
    pub health: f32,
    pub team: Option<TeamKey>,
    /// Last reported planar position; None until the first report
    pub position: Option<Position>,
    /// Join order, used for deterministic team formation
    pub joined_seq: u64,
}

/// Result of a damage application
#[derive(Debug, Clone, Copy)]
pub struct DamageOutcome {
    pub remaining_health: f32,
    pub died: bool,
}

/// The roster of currently connected players
///
/// Alive flags are written only here (via `eliminate`, `mark_all_alive`,
/// `reset_match_state`, `apply_damage`); the zone damage loop and victory
/// evaluation only read them.
pub struct Roster {
    players: DashMap<Uuid, PlayerRecord>,
    join_counter: AtomicU64,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
            join_counter: AtomicU64::new(0),
        }
    }

    /// Add a player; returns false if already present
    pub fn insert(&self, id: Uuid, display_name: String) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let seq = self.join_counter.fetch_add(1, Ordering::Relaxed);
        self.players.insert(
            id,
            PlayerRecord {
                id,
                display_name,
                alive: false,
                health: MAX_HEALTH,
                team: None,
                position: None,
                joined_seq: seq,
            },
        );
        true
    }

    /// Remove a player on disconnect
    pub fn remove(&self, id: Uuid) -> Option<PlayerRecord> {
        self.players.remove(&id).map(|(_, p)| p)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Player ids in join order (deterministic team formation input)
    pub fn ordered_ids(&self) -> Vec<Uuid> {
        let mut entries: Vec<(u64, Uuid)> = self
            .players
            .iter()
            .map(|e| (e.joined_seq, e.id))
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, id)| id).collect()
    }

    pub fn display_name(&self, id: Uuid) -> Option<String> {
        self.players.get(&id).map(|p| p.display_name.clone())
    }

    /// Mark every roster member alive at full health (Starting phase)
    pub fn mark_all_alive(&self) {
        for mut entry in self.players.iter_mut() {
            entry.alive = true;
            entry.health = MAX_HEALTH;
        }
    }

    /// Clear per-match state (Cleanup phase)
    pub fn reset_match_state(&self) {
        for mut entry in self.players.iter_mut() {
            entry.alive = false;
            entry.health = MAX_HEALTH;
            entry.team = None;
        }
    }

    pub fn set_team(&self, id: Uuid, key: TeamKey) {
        if let Some(mut entry) = self.players.get_mut(&id) {
            entry.team = Some(key);
        }
    }

    pub fn team_of(&self, id: Uuid) -> Option<TeamKey> {
        self.players.get(&id).and_then(|p| p.team)
    }

    pub fn set_position(&self, id: Uuid, position: Position) {
        if let Some(mut entry) = self.players.get_mut(&id) {
            entry.position = Some(position);
        }
    }

    pub fn is_alive(&self, id: Uuid) -> bool {
        self.players.get(&id).map(|p| p.alive).unwrap_or(false)
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Snapshot of alive flags keyed by player id
    pub fn alive_map(&self) -> HashMap<Uuid, bool> {
        self.players.iter().map(|p| (p.id, p.alive)).collect()
    }

    /// Alive players with their last reported positions
    pub fn alive_positions(&self) -> Vec<(Uuid, Option<Position>)> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(|p| (p.id, p.position))
            .collect()
    }

    /// Flip a player's alive flag to false
    ///
    /// Returns true only on the transition; eliminating an unknown or
    /// already-dead player is a no-op.
    pub fn eliminate(&self, id: Uuid) -> bool {
        match self.players.get_mut(&id) {
            Some(mut entry) if entry.alive => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Reduce a player's health; kills at zero
    ///
    /// Dead or unknown players are left untouched (died = false).
    pub fn apply_damage(&self, id: Uuid, amount: f32) -> DamageOutcome {
        match self.players.get_mut(&id) {
            Some(mut entry) if entry.alive => {
                entry.health = (entry.health - amount).max(0.0);
                let died = entry.health <= 0.0;
                if died {
                    entry.alive = false;
                }
                DamageOutcome {
                    remaining_health: entry.health,
                    died,
                }
            }
            _ => DamageOutcome {
                remaining_health: 0.0,
                died: false,
            },
        }
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eliminate_flips_alive_exactly_once() {
        let roster = Roster::new();
        let id = Uuid::new_v4();
        roster.insert(id, "rex".into());
        roster.mark_all_alive();

        assert!(roster.eliminate(id));
        assert!(!roster.eliminate(id));
        assert!(!roster.is_alive(id));
        assert!(!roster.eliminate(Uuid::new_v4()));
    }

    #[test]
    fn ordered_ids_follow_join_order() {
        let roster = Roster::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        for (id, name) in [(a, "a"), (b, "b"), (c, "c")] {
            roster.insert(id, name.into());
        }
        assert_eq!(roster.ordered_ids(), vec![a, b, c]);

        // A rejoin goes to the back
        roster.remove(b);
        roster.insert(b, "b".into());
        assert_eq!(roster.ordered_ids(), vec![a, c, b]);
    }

    #[test]
    fn damage_kills_at_zero_and_ignores_the_dead() {
        let roster = Roster::new();
        let id = Uuid::new_v4();
        roster.insert(id, "raptor".into());
        roster.mark_all_alive();

        let hit = roster.apply_damage(id, 60.0);
        assert!(!hit.died);
        assert_eq!(hit.remaining_health, 40.0);

        let lethal = roster.apply_damage(id, 50.0);
        assert!(lethal.died);
        assert_eq!(lethal.remaining_health, 0.0);

        // Further damage on a dead player is a no-op
        assert!(!roster.apply_damage(id, 10.0).died);
    }
}
