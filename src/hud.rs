//! HUD and result overlay output
//!
//! Plain data handed to the host every tick. Nothing in here feeds back into
//! the simulation.

use serde::{Deserialize, Serialize};

use crate::sim::{BattleState, Encounter, MonsterId};

/// How an encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
}

/// Cooldown shown on the result overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "until", rename_all = "snake_case")]
pub enum CooldownStatus {
    /// No cooldown applies
    Clear,
    /// Loss report still in flight
    Pending,
    /// Battles locked until this wall-clock timestamp (ms)
    Until(f64),
    /// Loss report failed; expiry is not known
    Unknown,
}

/// Result overlay payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub outcome: Outcome,
    pub wins_today: u32,
    pub max_wins_per_day: u32,
    pub cooldown: CooldownStatus,
}

/// Handed to the owning session when the player dismisses the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub outcome: Outcome,
    /// Waves fully cleared
    pub waves_cleared: u32,
    pub total_waves: u32,
}

/// HP bar fill for one monster
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonsterBar {
    pub id: MonsterId,
    pub ratio: f32,
}

/// Everything the HUD needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub state: BattleState,
    /// 1-based wave number
    pub wave_number: u32,
    pub total_waves: u32,
    /// Alive monsters plus those not yet spawned this wave
    pub remaining_monsters: u32,
    pub player_hp_ratio: f32,
    /// Live monsters in spawn order
    pub monster_bars: Vec<MonsterBar>,
    pub result: Option<ResultPayload>,
    /// Refreshed overlay countdown, present once a result exists
    pub cooldown_text: Option<String>,
}

impl HudSnapshot {
    pub fn capture(encounter: &Encounter) -> Self {
        let player = &encounter.player;
        let monster_bars = encounter
            .monsters
            .iter()
            .filter(|m| m.is_alive())
            .map(|m| MonsterBar {
                id: m.id,
                ratio: m.hp_ratio(),
            })
            .collect();

        let result = encounter.result;
        Self {
            state: encounter.state,
            wave_number: encounter.wave_index + 1,
            total_waves: encounter.total_waves,
            remaining_monsters: encounter.remaining_monsters(),
            player_hp_ratio: player.hp_ratio(),
            monster_bars,
            result,
            cooldown_text: result.map(|r| cooldown_text(r.cooldown, encounter.now_ms())),
        }
    }
}

/// Render the overlay countdown for a cooldown status
pub fn cooldown_text(status: CooldownStatus, now_ms: f64) -> String {
    match status {
        CooldownStatus::Clear => "Ready".to_string(),
        CooldownStatus::Pending => "…".to_string(),
        CooldownStatus::Unknown => "Unknown".to_string(),
        CooldownStatus::Until(until) => {
            let remaining_secs = ((until - now_ms) / 1000.0).ceil();
            if remaining_secs <= 0.0 {
                return "Ready".to_string();
            }
            let total = remaining_secs as u64;
            let hours = total / 3600;
            let mins = (total % 3600) / 60;
            let secs = total % 60;
            if hours > 0 {
                format!("{}h {:02}m", hours, mins)
            } else if mins > 0 {
                format!("{}m {:02}s", mins, secs)
            } else {
                format!("{}s", secs)
            }
        }
    }
}
