//! Victory evaluation - pure functions over alive state

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::{ModeId, Winner};

use super::team::{TeamKey, TeamSet};

/// Determine a winner, or None if the match is still undecided
///
/// Solo: exactly one alive player wins; zero alive is a draw (no winner, the
/// coordinator's timeout path is the only exit). Grouped: exactly one team
/// with at least one alive member wins. Simultaneous eliminations that empty
/// every team produce no winner this tick; the caller re-evaluates next tick.
pub fn evaluate(mode: ModeId, teams: &TeamSet, alive: &HashMap<Uuid, bool>) -> Option<Winner> {
    match mode {
        ModeId::Solo => {
            let mut survivors = alive.iter().filter(|(_, a)| **a).map(|(id, _)| *id);
            match (survivors.next(), survivors.next()) {
                (Some(id), None) => Some(Winner::Player { id }),
                _ => None,
            }
        }
        ModeId::Duos | ModeId::Trios => {
            let mut standing = teams.teams().iter().filter(|t| {
                t.members
                    .iter()
                    .any(|m| alive.get(m).copied().unwrap_or(false))
            });
            match (standing.next(), standing.next()) {
                (Some(team), None) => Some(match team.key {
                    TeamKey::Squad(key) => Winner::Team { key },
                    TeamKey::Solo(id) => Winner::Player { id },
                }),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::team::form_teams;

    fn alive_map(entries: &[(Uuid, bool)]) -> HashMap<Uuid, bool> {
        entries.iter().copied().collect()
    }

    #[test]
    fn solo_last_player_standing_wins() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let teams = form_teams(ModeId::Solo, &ids);

        let alive = alive_map(&[(ids[0], false), (ids[1], true), (ids[2], false)]);
        assert_eq!(
            evaluate(ModeId::Solo, &teams, &alive),
            Some(Winner::Player { id: ids[1] })
        );
    }

    #[test]
    fn solo_zero_or_many_alive_is_no_winner() {
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let teams = form_teams(ModeId::Solo, &ids);

        let none_alive = alive_map(&[(ids[0], false), (ids[1], false)]);
        assert_eq!(evaluate(ModeId::Solo, &teams, &none_alive), None);

        let both_alive = alive_map(&[(ids[0], true), (ids[1], true)]);
        assert_eq!(evaluate(ModeId::Solo, &teams, &both_alive), None);
    }

    #[test]
    fn duos_one_standing_team_wins_on_any_member() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let teams = form_teams(ModeId::Duos, &ids);

        // Second squad wiped, first squad has a lone survivor
        let alive = alive_map(&[
            (ids[0], false),
            (ids[1], true),
            (ids[2], false),
            (ids[3], false),
        ]);
        assert_eq!(
            evaluate(ModeId::Duos, &teams, &alive),
            Some(Winner::Team { key: 0 })
        );
    }

    #[test]
    fn duos_simultaneous_wipe_is_no_winner() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let teams = form_teams(ModeId::Duos, &ids);

        let alive = alive_map(&ids.iter().map(|id| (*id, false)).collect::<Vec<_>>());
        assert_eq!(evaluate(ModeId::Duos, &teams, &alive), None);
    }
}
