//! Balance curves: player level and wave index to numeric stats
//!
//! The simulation only sees the `BalanceProvider` trait. `BalanceTable` is the
//! data-driven implementation loaded alongside the arena settings.

use serde::{Deserialize, Serialize};

/// Player stats derived from account level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub max_hp: f32,
    pub damage_per_hit: u32,
    /// Pixels per second
    pub move_speed: f32,
    pub hit_cooldown_ms: f64,
}

/// Stats for monsters of one wave
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonsterStats {
    pub max_hp: u32,
    pub damage: f32,
    pub attack_cooldown_ms: f64,
    /// Multiplier on the player's move speed
    pub wave_speed_multiplier: f32,
}

/// Pure stat functions consumed by the simulation
pub trait BalanceProvider {
    fn player_stats(&self, level: u32) -> PlayerStats;
    /// Number of waves in an encounter at this level
    fn total_waves(&self, level: u32) -> u32;
    /// Number of monsters in a wave (`wave_index` is 0-based)
    fn wave_size(&self, level: u32, wave_index: u32) -> u32;
    fn spawn_interval_ms(&self, level: u32) -> f64;
    fn monster_stats(&self, level: u32, wave_index: u32) -> MonsterStats;
    fn level_speed_multiplier(&self, level: u32) -> f32;
    fn regen_level_multiplier(&self, level: u32) -> f32;
}

/// A value that grows linearly and is optionally capped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub base: f32,
    pub step: f32,
    #[serde(default)]
    pub max: Option<f32>,
}

impl Curve {
    pub const fn new(base: f32, step: f32) -> Self {
        Self {
            base,
            step,
            max: None,
        }
    }

    pub const fn capped(base: f32, step: f32, max: f32) -> Self {
        Self {
            base,
            step,
            max: Some(max),
        }
    }

    /// Evaluate at `x` (level - 1 or wave index)
    pub fn at(&self, x: u32) -> f32 {
        let value = self.base + self.step * x as f32;
        match self.max {
            Some(max) if self.step >= 0.0 => value.min(max),
            Some(min) => value.max(min),
            None => value,
        }
    }
}

/// Table-driven balance. Level curves are evaluated at `level - 1`, wave
/// curves at the 0-based wave index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceTable {
    // Player, by level
    pub player_max_hp: Curve,
    pub player_damage: Curve,
    pub player_move_speed: Curve,
    pub player_hit_cooldown_ms: Curve,

    // Encounter shape
    /// Waves per encounter, by level
    pub total_waves: Curve,
    /// Monsters per wave, by wave index
    pub wave_size: Curve,
    /// Extra monsters per wave, by level
    pub wave_size_level_bonus: Curve,
    /// Spawn interval, by level (shrinks)
    pub spawn_interval_ms: Curve,

    // Monsters
    /// Monster HP, by wave index
    pub monster_hp: Curve,
    /// Monster HP multiplier, by level
    pub monster_hp_level_multiplier: Curve,
    /// Monster damage, by wave index
    pub monster_damage: Curve,
    /// Attack cooldown, by wave index (shrinks)
    pub monster_attack_cooldown_ms: Curve,
    /// Monster speed relative to the player, by wave index
    pub wave_speed_multiplier: Curve,
    /// Monster speed multiplier, by level
    pub level_speed_multiplier: Curve,

    /// Regen multiplier, by level
    pub regen_level_multiplier: Curve,
}

impl Default for BalanceTable {
    fn default() -> Self {
        Self {
            player_max_hp: Curve::new(100.0, 10.0),
            player_damage: Curve::new(10.0, 2.0),
            player_move_speed: Curve::capped(120.0, 2.0, 180.0),
            player_hit_cooldown_ms: Curve::capped(450.0, -10.0, 250.0),

            total_waves: Curve::capped(3.0, 0.2, 8.0),
            wave_size: Curve::new(3.0, 1.0),
            wave_size_level_bonus: Curve::capped(0.0, 0.25, 4.0),
            spawn_interval_ms: Curve::capped(2500.0, -50.0, 1000.0),

            monster_hp: Curve::new(20.0, 8.0),
            monster_hp_level_multiplier: Curve::new(1.0, 0.1),
            monster_damage: Curve::new(5.0, 1.5),
            monster_attack_cooldown_ms: Curve::capped(1400.0, -100.0, 700.0),
            wave_speed_multiplier: Curve::capped(0.35, 0.05, 0.8),
            level_speed_multiplier: Curve::capped(1.0, 0.02, 1.5),

            regen_level_multiplier: Curve::capped(1.0, 0.05, 2.0),
        }
    }
}

fn level_x(level: u32) -> u32 {
    level.saturating_sub(1)
}

impl BalanceProvider for BalanceTable {
    fn player_stats(&self, level: u32) -> PlayerStats {
        let x = level_x(level);
        PlayerStats {
            max_hp: self.player_max_hp.at(x).max(1.0),
            damage_per_hit: self.player_damage.at(x).max(1.0).round() as u32,
            move_speed: self.player_move_speed.at(x).max(1.0),
            hit_cooldown_ms: self.player_hit_cooldown_ms.at(x).max(0.0) as f64,
        }
    }

    fn total_waves(&self, level: u32) -> u32 {
        self.total_waves.at(level_x(level)).floor().max(1.0) as u32
    }

    fn wave_size(&self, level: u32, wave_index: u32) -> u32 {
        let size = self.wave_size.at(wave_index) + self.wave_size_level_bonus.at(level_x(level));
        size.floor().max(1.0) as u32
    }

    fn spawn_interval_ms(&self, level: u32) -> f64 {
        self.spawn_interval_ms.at(level_x(level)).max(0.0) as f64
    }

    fn monster_stats(&self, level: u32, wave_index: u32) -> MonsterStats {
        let hp = self.monster_hp.at(wave_index)
            * self.monster_hp_level_multiplier.at(level_x(level));
        MonsterStats {
            max_hp: hp.round().max(1.0) as u32,
            damage: self.monster_damage.at(wave_index).max(0.0),
            attack_cooldown_ms: self.monster_attack_cooldown_ms.at(wave_index).max(0.0) as f64,
            wave_speed_multiplier: self.wave_speed_multiplier.at(wave_index).max(0.0),
        }
    }

    fn level_speed_multiplier(&self, level: u32) -> f32 {
        self.level_speed_multiplier.at(level_x(level)).max(0.0)
    }

    fn regen_level_multiplier(&self, level: u32) -> f32 {
        self.regen_level_multiplier.at(level_x(level)).max(0.0)
    }
}
