//! Wave Arena - a lane-based wave combat simulation core
//!
//! Core modules:
//! - `sim`: Tick-driven simulation (spawning, monster AI, combat, regen, battle state)
//! - `balance`: Level/wave stat curves consumed by the simulation
//! - `settings`: Arena geometry and timing configuration
//! - `hud`: Per-tick output for the host HUD and result overlay
//! - `report`: Fire-and-forget loss reporting to the owning session

pub mod balance;
pub mod hud;
pub mod report;
pub mod settings;
pub mod sim;

pub use balance::{BalanceProvider, BalanceTable, MonsterStats, PlayerStats};
pub use hud::{BattleOutcome, CooldownStatus, HudSnapshot, Outcome, ResultPayload};
pub use report::{LossAck, LossReply, LossReport, LossReporter, ReportError};
pub use settings::{BattleConfig, ConfigError, Settings};

use glam::Vec2;

/// Default tuning constants
pub mod consts {
    /// Default number of lanes along the movement axis
    pub const LANE_COUNT: i32 = 15;
    /// Pixel size of one lane/column tile
    pub const TILE_SIZE: f32 = 32.0;

    /// Column the player walks in
    pub const PLAYER_COLUMN: i32 = 2;
    /// Column monsters spawn and walk in
    pub const MONSTER_COLUMN: i32 = 3;

    /// Fixed delay between a cleared wave and the next wave setup
    pub const NEXT_WAVE_DELAY_MS: f64 = 800.0;
    /// Post-spawn invulnerability (and fade-in) window
    pub const SPAWN_GRACE_MS: f64 = 1000.0;
    /// Death fade-out duration before a monster leaves the roster
    pub const DEATH_FADE_MS: f64 = 400.0;

    /// Regen is dormant at or above this fraction of max HP
    pub const REGEN_THRESHOLD: f32 = 0.8;
    /// Regen ceiling while any monster is alive
    pub const REGEN_MID_FIGHT_CAP: f32 = 0.7;
    /// Extra regen per wave index
    pub const REGEN_WAVE_BONUS: f32 = 0.2;
}

/// Y coordinate of a lane's centre line
#[inline]
pub fn lane_center_y(lane: i32, tile_size: f32) -> f32 {
    (lane as f32 + 0.5) * tile_size
}

/// X coordinate of a column's centre line
#[inline]
pub fn column_center_x(column: i32, tile_size: f32) -> f32 {
    (column as f32 + 0.5) * tile_size
}

/// Lane index containing a continuous y, clamped to the arena
#[inline]
pub fn lane_of(y: f32, tile_size: f32, lane_count: i32) -> i32 {
    ((y / tile_size).floor() as i32).clamp(0, lane_count - 1)
}

/// Pixel position of a tile centre
#[inline]
pub fn tile_center(column: i32, lane: i32, tile_size: f32) -> Vec2 {
    Vec2::new(
        column_center_x(column, tile_size),
        lane_center_y(lane, tile_size),
    )
}

/// Move `current` toward `target` by at most `max_step`, never overshooting
#[inline]
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}
