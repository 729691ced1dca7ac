//! Time utilities for the match driver and zone loops

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Driver tick rate: one phase-handler step per tick
pub const DRIVER_TICK_MS: u64 = 100;
/// Zone interpolation rate (20 Hz for smooth radius/center movement)
pub const ZONE_INTERP_MS: u64 = 50;

pub const DRIVER_TICK: Duration = Duration::from_millis(DRIVER_TICK_MS);
pub const ZONE_INTERP_TICK: Duration = Duration::from_millis(ZONE_INTERP_MS);

/// Seconds elapsed per driver tick, for countdown bookkeeping
pub fn driver_delta() -> f32 {
    DRIVER_TICK_MS as f32 / 1000.0
}
