//! Player health regeneration
//!
//! Regen wakes up once HP drops below the threshold and then keeps going
//! until it reaches the cap, even if that cap sits above the threshold. While
//! monsters are alive the cap is a fraction of max HP.

use super::effects::{Effect, EntityRef};
use super::state::{BattleState, Encounter};

/// Heal the player for one tick. Returns the amount healed.
pub fn update_regen(encounter: &mut Encounter, dt_ms: f64) -> f32 {
    if !matches!(encounter.state, BattleState::Wave | BattleState::Fight) {
        return 0.0;
    }

    let now = encounter.now_ms();
    let settings = &encounter.settings;
    let (threshold, mid_fight_cap) = (settings.regen_threshold, settings.regen_mid_fight_cap);
    let (delay_ms, base_percent) = (settings.regen_delay_ms, settings.regen_base_percent);
    let wave_bonus = 1.0 + encounter.wave_index as f32 * settings.regen_wave_bonus;
    let level_multiplier = encounter.balance.regen_level_multiplier(encounter.level());
    let monsters_alive = encounter.monsters.alive_count() > 0;

    let player = &mut encounter.player;
    if !player.is_alive() {
        return 0.0;
    }
    if !player.regenerating {
        if player.hp >= player.max_hp * threshold {
            return 0.0;
        }
        player.regenerating = true;
    }
    if player
        .last_damage_at
        .is_some_and(|last| now - last < delay_ms)
    {
        return 0.0;
    }

    let cap = if monsters_alive {
        player.max_hp * mid_fight_cap
    } else {
        player.max_hp
    };
    if player.hp >= cap {
        player.regenerating = false;
        return 0.0;
    }

    let seconds = (dt_ms / 1000.0) as f32;
    let amount = player.max_hp * (base_percent / 100.0) * wave_bonus * level_multiplier * seconds;
    let healed_to = (player.hp + amount).min(cap);
    let healed = healed_to - player.hp;
    player.hp = healed_to;
    if healed_to >= cap {
        player.regenerating = false;
    }

    let ratio = player.hp_ratio();
    if healed > 0.0 {
        encounter.emit(Effect::HealthBar {
            entity: EntityRef::Player,
            ratio,
        });
    }
    healed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testing::{encounter_in_fight, place_monster};

    #[test]
    fn dormant_above_threshold() {
        let mut enc = encounter_in_fight(1);
        enc.player.hp = enc.player.max_hp * 0.85;
        assert_eq!(update_regen(&mut enc, 1000.0), 0.0);
        assert!(!enc.player.regenerating);
    }

    #[test]
    fn mid_fight_cap_holds_with_monsters_alive() {
        let mut enc = encounter_in_fight(1);
        place_monster(&mut enc, 0, 50);
        enc.player.max_hp = 100.0;
        enc.player.hp = 40.0;

        let mut last = enc.player.hp;
        for _ in 0..2000 {
            enc.advance_clock(50.0);
            update_regen(&mut enc, 50.0);
            assert!(enc.player.hp >= last);
            assert!(enc.player.hp <= 70.0 + f32::EPSILON);
            last = enc.player.hp;
        }
        assert!((enc.player.hp - 70.0).abs() < 1e-3);
    }

    #[test]
    fn continues_past_threshold_to_full_when_arena_empty() {
        let mut enc = encounter_in_fight(1);
        enc.player.max_hp = 100.0;
        enc.player.hp = 79.0;
        for _ in 0..2000 {
            enc.advance_clock(50.0);
            update_regen(&mut enc, 50.0);
        }
        assert_eq!(enc.player.hp, 100.0);
        assert!(!enc.player.regenerating);
    }

    #[test]
    fn waits_out_damage_delay() {
        let mut enc = encounter_in_fight(1);
        let delay = enc.settings.regen_delay_ms;
        enc.player.hp = 10.0;
        enc.player.last_damage_at = Some(enc.now_ms());

        enc.advance_clock(delay - 1.0);
        assert_eq!(update_regen(&mut enc, 16.0), 0.0);
        assert_eq!(enc.player.hp, 10.0);

        enc.advance_clock(1.0);
        assert!(update_regen(&mut enc, 16.0) > 0.0);
    }

    #[test]
    fn rate_scales_with_wave() {
        let mut first = encounter_in_fight(1);
        first.player.hp = 10.0;
        let mut third = encounter_in_fight(1);
        third.wave_index = 2;
        third.player.hp = 10.0;

        let a = update_regen(&mut first, 1000.0);
        let b = update_regen(&mut third, 1000.0);
        assert!((b / a - 1.4).abs() < 1e-4, "{a} vs {b}");
    }

    #[test]
    fn no_regen_outside_fight() {
        let mut enc = encounter_in_fight(1);
        enc.player.hp = 10.0;
        enc.state = BattleState::NextWave;
        assert_eq!(update_regen(&mut enc, 1000.0), 0.0);
    }
}
