//! Team formation and mode configuration

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::ModeId;

/// Static per-mode configuration, fixed once the match starts
#[derive(Debug, Clone, Copy)]
pub struct ModeConfig {
    /// Players per team
    pub team_size: usize,
}

impl ModeConfig {
    pub fn for_mode(mode: ModeId) -> Self {
        match mode {
            ModeId::Solo => Self { team_size: 1 },
            ModeId::Duos => Self { team_size: 2 },
            ModeId::Trios => Self { team_size: 3 },
        }
    }
}

/// Team identity: a player's own id in solo, a synthetic index otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamKey {
    Solo(Uuid),
    Squad(u32),
}

/// Ordered member list sharing a win/lose outcome
#[derive(Debug, Clone)]
pub struct Team {
    pub key: TeamKey,
    pub members: Vec<Uuid>,
}

/// The frozen team partition for one match
#[derive(Debug, Clone, Default)]
pub struct TeamSet {
    teams: Vec<Team>,
}

impl TeamSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn team(&self, key: TeamKey) -> Option<&Team> {
        self.teams.iter().find(|t| t.key == key)
    }

    /// Number of teams with at least one alive member
    pub fn alive_teams(&self, alive: &HashMap<Uuid, bool>) -> usize {
        self.teams
            .iter()
            .filter(|t| t.members.iter().any(|m| alive.get(m).copied().unwrap_or(false)))
            .count()
    }

    /// Whether every member of the given team is eliminated
    pub fn is_team_eliminated(&self, key: TeamKey, alive: &HashMap<Uuid, bool>) -> bool {
        self.team(key)
            .map(|t| !t.members.iter().any(|m| alive.get(m).copied().unwrap_or(false)))
            .unwrap_or(false)
    }
}

/// Partition the roster into teams for the selected mode
///
/// Solo places every player in a singleton team keyed by their own id.
/// Grouped modes pack players in roster join order into sequential squads of
/// up to `team_size` members. No shuffling; the input order decides.
pub fn form_teams(mode: ModeId, ordered_roster: &[Uuid]) -> TeamSet {
    let config = ModeConfig::for_mode(mode);

    let teams = if config.team_size <= 1 {
        ordered_roster
            .iter()
            .map(|&id| Team {
                key: TeamKey::Solo(id),
                members: vec![id],
            })
            .collect()
    } else {
        ordered_roster
            .chunks(config.team_size)
            .enumerate()
            .map(|(idx, chunk)| Team {
                key: TeamKey::Squad(idx as u32),
                members: chunk.to_vec(),
            })
            .collect()
    };

    TeamSet { teams }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn solo_forms_singleton_teams() {
        let ids = roster(7);
        let set = form_teams(ModeId::Solo, &ids);

        assert_eq!(set.len(), 7);
        for (team, id) in set.teams().iter().zip(&ids) {
            assert_eq!(team.key, TeamKey::Solo(*id));
            assert_eq!(team.members, vec![*id]);
        }
    }

    #[test]
    fn duos_pack_sequentially_with_remainder() {
        let ids = roster(5);
        let set = form_teams(ModeId::Duos, &ids);

        // ceil(5 / 2) teams, none larger than the team size
        assert_eq!(set.len(), 3);
        assert!(set.teams().iter().all(|t| t.members.len() <= 2));
        assert_eq!(set.teams()[2].members, vec![ids[4]]);
    }

    #[test]
    fn partition_is_a_disjoint_cover() {
        let ids = roster(10);
        let set = form_teams(ModeId::Trios, &ids);

        let mut seen = HashSet::new();
        for team in set.teams() {
            for member in &team.members {
                assert!(seen.insert(*member), "player assigned twice");
            }
        }
        assert_eq!(seen, ids.iter().copied().collect());
    }
}
