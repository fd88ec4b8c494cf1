//! Clocks and tick-rate constants for the simulation.
//!
//! Two clocks exist: the fixed-rate authoritative tick driven by the
//! coordinator task, and whatever variable-rate loop a predictive client
//! runs. Everything downstream is delta-time-scaled, so both work.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Authoritative simulation rate (ticks per second).
pub const SIMULATION_TPS: u32 = 30;
/// Snapshot broadcast rate (snapshots per second).
pub const SNAPSHOT_TPS: u32 = 10;

pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Fixed delta time of one authoritative tick, in seconds.
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
