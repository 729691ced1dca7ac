//! Application state shared across routes

use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::{Broadcast, TokioBroadcast};
use crate::collab::RosterDamage;
use crate::config::Config;
use crate::game::{MatchCoordinator, MatchRules, Roster, ZoneController, ZoneSchedule};
use crate::ws::protocol::Position;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<MatchCoordinator>,
    pub broadcast: Arc<TokioBroadcast>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let broadcast = Arc::new(TokioBroadcast::new());
        let channel: Arc<dyn Broadcast> = broadcast.clone();

        let roster = Arc::new(Roster::new());
        let damage = Arc::new(RosterDamage::new(roster.clone(), channel.clone()));

        let schedule = ZoneSchedule::standard(Position::default(), config.map_size);
        let zone = Arc::new(ZoneController::new(
            schedule,
            config.zone_warning_secs,
            Duration::from_secs_f32(config.zone_damage_interval_secs),
            rand::random::<u64>(),
            channel.clone(),
            roster.clone(),
            damage,
        ));

        // The terrain, dinosaur, and loot subsystems live outside this
        // server; their absence is tolerated at every call site
        let coordinator = Arc::new(MatchCoordinator::new(
            MatchRules::from_config(&config),
            roster,
            zone,
            channel,
            None,
            None,
            None,
        ));

        Self {
            config,
            coordinator,
            broadcast,
        }
    }
}
