//! Arena settings and battle configuration
//!
//! Loaded from a JSON file next to the host; every field has a default so
//! partial files are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balance::BalanceTable;
use crate::consts::*;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid arena settings: {0}")]
    Invalid(String),
}

/// Arena geometry and timing constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Geometry ===
    /// Number of lanes along the movement axis
    pub lane_count: i32,
    /// Pixel size of one tile
    pub tile_size: f32,
    /// Column the player walks in
    pub player_column: i32,
    /// Column monsters occupy (the only clickable column)
    pub monster_column: i32,

    // === Spawning ===
    /// Countdown before the first monster of a wave
    pub first_spawn_delay_ms: f64,
    /// Minimum lane distance between a new spawn and the player
    pub spawn_min_separation: i32,
    /// Distance of the relocated spawn lane from the arena edge
    pub spawn_edge_margin: i32,
    /// Invulnerability + fade-in window after spawning
    pub spawn_grace_ms: f64,

    // === Monster AI ===
    /// Lane distance that permanently alerts a monster
    pub alert_radius_lanes: i32,
    /// Straight-line reach of a monster attack (pixels)
    pub attack_range_px: f32,
    /// Patrol speed (pixels/second)
    pub patrol_speed: f32,
    /// Distance below which a patrol target counts as reached
    pub patrol_reach_px: f32,

    // === Combat ===
    /// Lane distance within which the player can land a hit
    pub melee_range_lanes: i32,
    /// Duration of the player's hit animation before returning to idle
    pub hit_anim_ms: f64,
    /// Death fade-out before removal
    pub death_fade_ms: f64,
    /// Pause between a cleared wave and the next
    pub next_wave_delay_ms: f64,

    // === Regeneration ===
    /// Regen does not start at or above this fraction of max HP
    pub regen_threshold: f32,
    /// Regen ceiling while monsters are alive (fraction of max HP)
    pub regen_mid_fight_cap: f32,
    /// No regen within this window after taking damage
    pub regen_delay_ms: f64,
    /// Base regen rate, percent of max HP per second
    pub regen_base_percent: f32,
    /// Extra regen multiplier per wave index
    pub regen_wave_bonus: f32,

    // === Loop ===
    /// Longest frame the simulation will integrate in one tick
    pub max_frame_ms: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lane_count: LANE_COUNT,
            tile_size: TILE_SIZE,
            player_column: PLAYER_COLUMN,
            monster_column: MONSTER_COLUMN,

            first_spawn_delay_ms: 500.0,
            spawn_min_separation: 3,
            spawn_edge_margin: 1,
            spawn_grace_ms: SPAWN_GRACE_MS,

            alert_radius_lanes: 4,
            attack_range_px: 40.0,
            patrol_speed: 30.0,
            patrol_reach_px: 2.0,

            melee_range_lanes: 1,
            hit_anim_ms: 250.0,
            death_fade_ms: DEATH_FADE_MS,
            next_wave_delay_ms: NEXT_WAVE_DELAY_MS,

            regen_threshold: REGEN_THRESHOLD,
            regen_mid_fight_cap: REGEN_MID_FIGHT_CAP,
            regen_delay_ms: 2000.0,
            regen_base_percent: 2.0,
            regen_wave_bonus: REGEN_WAVE_BONUS,

            max_frame_ms: 100.0,
        }
    }
}

impl Settings {
    /// Centre lane, the default spawn lane
    pub fn center_lane(&self) -> i32 {
        self.lane_count / 2
    }

    /// Near-top lane used when relocating spawns
    pub fn top_spawn_lane(&self) -> i32 {
        self.spawn_edge_margin
    }

    /// Near-bottom lane used when relocating spawns
    pub fn bottom_spawn_lane(&self) -> i32 {
        self.lane_count - 1 - self.spawn_edge_margin
    }

    /// Topmost reachable y (centre of lane 0)
    pub fn min_y(&self) -> f32 {
        crate::lane_center_y(0, self.tile_size)
    }

    /// Bottommost reachable y (centre of the last lane)
    pub fn max_y(&self) -> f32 {
        crate::lane_center_y(self.lane_count - 1, self.tile_size)
    }

    /// Check that the arena can honour the spawn-separation rule
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count < 3 {
            return Err(ConfigError::Invalid(format!(
                "lane_count must be at least 3, got {}",
                self.lane_count
            )));
        }
        if self.tile_size <= 0.0 {
            return Err(ConfigError::Invalid("tile_size must be positive".into()));
        }
        if self.spawn_edge_margin < 0 || self.top_spawn_lane() >= self.bottom_spawn_lane() {
            return Err(ConfigError::Invalid(format!(
                "spawn_edge_margin {} leaves no spawn lanes",
                self.spawn_edge_margin
            )));
        }
        // Whichever edge lane is farther from the player must be far enough away
        let worst_case = (self.center_lane() - self.top_spawn_lane())
            .min(self.bottom_spawn_lane() - self.center_lane());
        if self.spawn_min_separation > worst_case {
            return Err(ConfigError::Invalid(format!(
                "spawn_min_separation {} exceeds the {} lanes available from the centre",
                self.spawn_min_separation, worst_case
            )));
        }
        if !(0.0..=1.0).contains(&self.regen_threshold)
            || !(0.0..=1.0).contains(&self.regen_mid_fight_cap)
        {
            return Err(ConfigError::Invalid(
                "regen fractions must lie in 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Complete battle configuration: arena settings plus balance curves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub settings: Settings,
    pub balance: BalanceTable,
}

impl BattleConfig {
    /// Parse and validate a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.settings.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded battle config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load a config file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Using default battle config ({}): {}",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }
}
