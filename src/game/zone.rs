//! Shrinking safe-zone controller
//!
//! Owns the zone state machine: phase progression with warnings, smooth
//! radius/center interpolation, and periodic damage outside the safe region.
//! Progression and damage run as two independent tokio tasks; radius and
//! center have a single writer (the progression task) and the damage loop
//! reads them as a matched pair under one lock acquisition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{info, warn};

use crate::broadcast::Broadcast;
use crate::collab::{DamageSink, PlayerPositionSource};
use crate::util::time::ZONE_INTERP_TICK;
use crate::ws::protocol::{Position, ServerMsg, ZoneState};

/// One shrink stage of the zone schedule
#[derive(Debug, Clone)]
pub struct ZonePhaseConfig {
    /// Delay before this stage starts shrinking (seconds)
    pub delay_secs: u32,
    /// Time to shrink to the end radius (seconds)
    pub shrink_secs: f32,
    /// Radius at the end of this stage
    pub end_radius: f32,
    /// Bound on center drift, as a fraction of the current radius per axis
    pub center_offset_fraction: f32,
    /// Damage per damage tick outside the zone during and after this stage
    pub damage_per_tick: f32,
}

/// The full ordered shrink schedule, loaded once and immutable
#[derive(Debug, Clone)]
pub struct ZoneSchedule {
    pub initial_radius: f32,
    pub initial_center: Position,
    pub phases: Vec<ZonePhaseConfig>,
}

impl ZoneSchedule {
    /// Standard four-stage schedule scaled to the map
    pub fn standard(map_center: Position, map_size: f32) -> Self {
        let r = map_size / 2.0;
        Self {
            initial_radius: r,
            initial_center: map_center,
            phases: vec![
                ZonePhaseConfig {
                    delay_secs: 60,
                    shrink_secs: 30.0,
                    end_radius: r * 0.65,
                    center_offset_fraction: 0.25,
                    damage_per_tick: 5.0,
                },
                ZonePhaseConfig {
                    delay_secs: 45,
                    shrink_secs: 25.0,
                    end_radius: r * 0.40,
                    center_offset_fraction: 0.20,
                    damage_per_tick: 10.0,
                },
                ZonePhaseConfig {
                    delay_secs: 30,
                    shrink_secs: 20.0,
                    end_radius: r * 0.20,
                    center_offset_fraction: 0.15,
                    damage_per_tick: 15.0,
                },
                ZonePhaseConfig {
                    delay_secs: 20,
                    shrink_secs: 15.0,
                    end_radius: r * 0.05,
                    center_offset_fraction: 0.10,
                    damage_per_tick: 25.0,
                },
            ],
        }
    }
}

/// The zone controller, created once per process and reset between matches
pub struct ZoneController {
    state: RwLock<ZoneState>,
    active: AtomicBool,
    schedule: ZoneSchedule,
    /// Remaining-delay threshold below which per-second warnings fire
    warning_threshold_secs: u32,
    damage_interval: Duration,
    broadcast: Arc<dyn Broadcast>,
    positions: Arc<dyn PlayerPositionSource>,
    damage: Arc<dyn DamageSink>,
    rng: Mutex<ChaCha8Rng>,
}

impl ZoneController {
    pub fn new(
        schedule: ZoneSchedule,
        warning_threshold_secs: u32,
        damage_interval: Duration,
        seed: u64,
        broadcast: Arc<dyn Broadcast>,
        positions: Arc<dyn PlayerPositionSource>,
        damage: Arc<dyn DamageSink>,
    ) -> Self {
        let state = ZoneState::inactive(schedule.initial_radius, schedule.initial_center);
        Self {
            state: RwLock::new(state),
            active: AtomicBool::new(false),
            schedule,
            warning_threshold_secs,
            damage_interval,
            broadcast,
            positions,
            damage,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Begin phase progression and the damage loop
    ///
    /// Idempotent: starting an already-active zone is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("Zone already active, ignoring start");
            return;
        }

        {
            let mut state = self.state.write();
            *state =
                ZoneState::inactive(self.schedule.initial_radius, self.schedule.initial_center);
            state.active = true;
        }

        info!(
            radius = self.schedule.initial_radius,
            phases = self.schedule.phases.len(),
            "Zone started"
        );

        let progression = Arc::clone(self);
        tokio::spawn(async move {
            progression.run_phases().await;
        });

        let damage = Arc::clone(self);
        tokio::spawn(async move {
            damage.run_damage().await;
        });
    }

    /// Deactivate; both loops observe the flag and exit on their next
    /// iteration without further state mutation
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.state.write().active = false;
            info!("Zone stopped");
        }
    }

    /// Reset to the inactive initial state (Cleanup phase; must be stopped)
    pub fn reset(&self) {
        if self.is_active() {
            warn!("Zone reset requested while active, stopping first");
            self.stop();
        }
        *self.state.write() =
            ZoneState::inactive(self.schedule.initial_radius, self.schedule.initial_center);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Current state snapshot, safe from any phase
    pub fn snapshot(&self) -> ZoneState {
        self.state.read().clone()
    }

    /// Signed distance to the zone edge; positive = inside
    pub fn distance_to_edge(&self, position: Position) -> f32 {
        let state = self.state.read();
        state.radius - position.distance_to(state.center)
    }

    pub fn is_inside(&self, position: Position) -> bool {
        self.distance_to_edge(position) >= 0.0
    }

    /// Phase progression: warnings, delay countdown, interpolation, snap
    async fn run_phases(self: Arc<Self>) {
        for (idx, phase) in self.schedule.phases.iter().enumerate() {
            let phase_index = (idx + 1) as u32;

            self.broadcast.publish(ServerMsg::ZoneWarning {
                delay_seconds: phase.delay_secs,
                upcoming_phase: phase_index,
            });

            // Pre-shrink delay, counted second by second
            let mut remaining = phase.delay_secs;
            while remaining > 0 {
                if !self.is_active() {
                    return;
                }
                sleep(Duration::from_secs(1)).await;
                remaining -= 1;
                if remaining > 0 && remaining <= self.warning_threshold_secs {
                    self.broadcast.publish(ServerMsg::ZoneWarning {
                        delay_seconds: remaining,
                        upcoming_phase: phase_index,
                    });
                }
            }
            if !self.is_active() {
                return;
            }

            let (start_radius, start_center) = {
                let state = self.state.read();
                (state.radius, state.center)
            };

            // New center drifts at most offset_fraction * current radius per axis
            let target_center = {
                let mut rng = self.rng.lock();
                let max_offset = phase.center_offset_fraction * start_radius;
                Position::new(
                    start_center.x + rng.gen_range(-max_offset..=max_offset),
                    start_center.z + rng.gen_range(-max_offset..=max_offset),
                )
            };

            {
                let mut state = self.state.write();
                state.phase = phase_index;
                state.target_radius = phase.end_radius;
                state.target_center = target_center;
                state.damage_per_tick = phase.damage_per_tick;
            }

            self.broadcast.publish(ServerMsg::ZoneUpdate {
                phase: phase_index,
                target_radius: phase.end_radius,
                target_center,
                damage: phase.damage_per_tick,
            });

            info!(
                phase = phase_index,
                target_radius = phase.end_radius,
                "Zone shrink started"
            );

            // Linear interpolation sampled at 20 Hz
            if phase.shrink_secs > 0.0 {
                let started = tokio::time::Instant::now();
                let mut ticker = interval(ZONE_INTERP_TICK);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;
                    if !self.is_active() {
                        return;
                    }
                    let t = (started.elapsed().as_secs_f32() / phase.shrink_secs)
                        .clamp(0.0, 1.0);
                    {
                        let mut state = self.state.write();
                        state.radius = start_radius + (phase.end_radius - start_radius) * t;
                        state.center = Position::new(
                            start_center.x + (target_center.x - start_center.x) * t,
                            start_center.z + (target_center.z - start_center.z) * t,
                        );
                    }
                    if t >= 1.0 {
                        break;
                    }
                }
            }

            // Snap exactly to the target so no floating drift carries over
            {
                let mut state = self.state.write();
                state.radius = phase.end_radius;
                state.center = target_center;
            }

            info!(phase = phase_index, radius = phase.end_radius, "Zone shrink complete");
        }

        info!("Zone schedule exhausted, holding final radius");
    }

    /// Damage loop: periodic sweep over alive players outside the zone
    async fn run_damage(self: Arc<Self>) {
        let mut ticker = interval(self.damage_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First interval tick completes immediately; skip it so the first
        // sweep happens one full interval after start
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !self.is_active() {
                return;
            }
            self.damage_sweep();
        }
    }

    /// One damage sweep over the current roster positions
    fn damage_sweep(&self) {
        // Radius and center must be read as a matched pair
        let (center, radius, damage) = {
            let state = self.state.read();
            (state.center, state.radius, state.damage_per_tick)
        };
        if damage <= 0.0 {
            return;
        }

        for (player_id, position) in self.positions.alive_positions() {
            // No active body yet; nothing to damage
            let Some(position) = position else { continue };

            if position.distance_to(center) > radius {
                self.damage.apply_damage(player_id, damage);
                self.broadcast.publish(ServerMsg::ZoneDamage {
                    player_id,
                    amount: damage,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RecordingBroadcast;
    use uuid::Uuid;

    struct NoPositions;
    impl PlayerPositionSource for NoPositions {
        fn alive_positions(&self) -> Vec<(Uuid, Option<Position>)> {
            Vec::new()
        }
    }

    struct FixedPositions(Vec<(Uuid, Option<Position>)>);
    impl PlayerPositionSource for FixedPositions {
        fn alive_positions(&self) -> Vec<(Uuid, Option<Position>)> {
            self.0.clone()
        }
    }

    struct RecordingSink(Mutex<Vec<(Uuid, f32)>>);
    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }
        fn hits(&self) -> Vec<(Uuid, f32)> {
            self.0.lock().clone()
        }
    }
    impl DamageSink for RecordingSink {
        fn apply_damage(&self, player_id: Uuid, amount: f32) {
            self.0.lock().push((player_id, amount));
        }
    }

    fn one_phase_schedule() -> ZoneSchedule {
        ZoneSchedule {
            initial_radius: 1000.0,
            initial_center: Position::default(),
            phases: vec![ZonePhaseConfig {
                delay_secs: 1,
                shrink_secs: 2.0,
                end_radius: 400.0,
                // Zero drift keeps the center deterministic for assertions
                center_offset_fraction: 0.0,
                damage_per_tick: 5.0,
            }],
        }
    }

    fn controller(
        schedule: ZoneSchedule,
        positions: Arc<dyn PlayerPositionSource>,
        sink: Arc<dyn DamageSink>,
    ) -> Arc<ZoneController> {
        Arc::new(ZoneController::new(
            schedule,
            10,
            Duration::from_secs(1),
            7,
            RecordingBroadcast::new(),
            positions,
            sink,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn shrink_is_monotone_and_snaps_to_target() {
        let zone = controller(one_phase_schedule(), Arc::new(NoPositions), RecordingSink::new());
        zone.start();

        let mut last_radius = zone.snapshot().radius;
        // 1s delay + 2s shrink, sampled every 50ms with headroom
        for _ in 0..70 {
            sleep(ZONE_INTERP_TICK).await;
            let state = zone.snapshot();
            assert!(state.radius <= last_radius, "radius increased");
            assert!(state.radius >= 400.0, "radius undershot the target");
            last_radius = state.radius;
        }

        let done = zone.snapshot();
        assert_eq!(done.radius, 400.0);
        assert_eq!(done.center, done.target_center);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_shrink_freezes_state() {
        let zone = controller(one_phase_schedule(), Arc::new(NoPositions), RecordingSink::new());
        zone.start();

        // Into the middle of the shrink interval
        sleep(Duration::from_millis(2000)).await;
        let mid = zone.snapshot();
        assert!(mid.radius < 1000.0 && mid.radius > 400.0);

        zone.stop();
        let frozen = zone.snapshot();
        assert!(!frozen.active);

        sleep(Duration::from_secs(3)).await;
        let later = zone.snapshot();
        assert_eq!(later.radius, frozen.radius);
        assert_eq!(later.center, frozen.center);
        assert!(!later.active);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let zone = controller(one_phase_schedule(), Arc::new(NoPositions), RecordingSink::new());
        zone.start();
        sleep(Duration::from_millis(1500)).await;
        let mid = zone.snapshot().radius;
        assert!(mid < 1000.0);

        // Second start must not reset the running shrink
        zone.start();
        assert!(zone.snapshot().radius <= mid);
    }

    #[test]
    fn damage_sweep_hits_only_positioned_outsiders() {
        let outside = Uuid::new_v4();
        let inside = Uuid::new_v4();
        let bodyless = Uuid::new_v4();

        let positions = Arc::new(FixedPositions(vec![
            (outside, Some(Position::new(900.0, 0.0))),
            (inside, Some(Position::new(10.0, 10.0))),
            (bodyless, None),
        ]));
        let sink = RecordingSink::new();

        let schedule = ZoneSchedule {
            initial_radius: 500.0,
            initial_center: Position::default(),
            phases: Vec::new(),
        };
        let zone = controller(schedule, positions, sink.clone());
        zone.state.write().damage_per_tick = 5.0;

        zone.damage_sweep();

        assert_eq!(sink.hits(), vec![(outside, 5.0)]);
    }

    #[test]
    fn zero_damage_phase_skips_the_sweep() {
        let player = Uuid::new_v4();
        let positions = Arc::new(FixedPositions(vec![(
            player,
            Some(Position::new(5000.0, 0.0)),
        )]));
        let sink = RecordingSink::new();

        let schedule = ZoneSchedule {
            initial_radius: 500.0,
            initial_center: Position::default(),
            phases: Vec::new(),
        };
        let zone = controller(schedule, positions, sink.clone());

        zone.damage_sweep();
        assert!(sink.hits().is_empty());
    }

    #[test]
    fn signed_distance_is_positive_inside() {
        let zone = controller(one_phase_schedule(), Arc::new(NoPositions), RecordingSink::new());
        assert!(zone.is_inside(Position::new(100.0, 100.0)));
        assert_eq!(zone.distance_to_edge(Position::default()), 1000.0);
        assert!(zone.distance_to_edge(Position::new(1500.0, 0.0)) < 0.0);
    }
}
