//! Combat resolution: player hits, monster attacks and deaths
//!
//! Every check compares absolute timestamps against the encounter clock, so
//! frame-rate variance never changes how often a hit can land.

use serde::{Deserialize, Serialize};

use super::effects::{Animation, Effect, EntityRef};
use super::state::{BattleState, BehaviorState, Encounter, MonsterId};

/// A click already mapped to arena coordinates by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneClick {
    pub lane: i32,
    pub column: i32,
}

/// Result of a hit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Damage applied; `killed` if the target's HP reached zero
    Landed { damage: u32, killed: bool },
    /// Handle is stale (monster already removed)
    TargetGone,
    TargetDead,
    Invulnerable,
    OnCooldown,
    OutOfRange,
}

impl HitOutcome {
    pub fn landed(self) -> bool {
        matches!(self, HitOutcome::Landed { .. })
    }
}

/// Handle a click. Invalid or empty lanes are ignored without touching the
/// current target.
pub fn click_lane(encounter: &mut Encounter, click: LaneClick) -> Option<HitOutcome> {
    if encounter.state != BattleState::Fight {
        return None;
    }
    let settings = &encounter.settings;
    let in_column = click.column == settings.monster_column;
    if !in_column || click.lane < 0 || click.lane >= settings.lane_count {
        log::trace!("Ignoring click outside the monster column: {:?}", click);
        return None;
    }

    let target = lane_target(encounter, click.lane)?;
    encounter.player.target = Some(target);
    Some(strike(encounter, target))
}

/// First hittable monster in `lane`, else the first live one
fn lane_target(encounter: &Encounter, lane: i32) -> Option<MonsterId> {
    let now = encounter.now_ms();
    let mut first_live = None;
    for monster in encounter.monsters.iter() {
        if !monster.is_alive() || monster.lane != lane {
            continue;
        }
        if !monster.is_invulnerable(now) {
            return Some(monster.id);
        }
        first_live.get_or_insert(monster.id);
    }
    first_live
}

/// Attempt a player hit on `target`
pub fn strike(encounter: &mut Encounter, target: MonsterId) -> HitOutcome {
    let now = encounter.now_ms();
    let player_lane = encounter.player.lane;
    let melee_range = encounter.settings.melee_range_lanes;
    let hit_anim_ms = encounter.settings.hit_anim_ms;

    let Some(monster) = encounter.monsters.get_mut(target) else {
        return HitOutcome::TargetGone;
    };
    if !monster.is_alive() {
        return HitOutcome::TargetDead;
    }
    if monster.is_invulnerable(now) {
        return HitOutcome::Invulnerable;
    }
    if now < encounter.player.hit_cooldown_until {
        return HitOutcome::OnCooldown;
    }
    if (monster.lane - player_lane).abs() > melee_range {
        return HitOutcome::OutOfRange;
    }

    let damage = encounter.player.damage_per_hit;
    let killed = monster.take_damage(damage);
    let ratio = monster.hp_ratio();
    log::trace!("Hit {:?} for {} ({} hp left)", target, damage, monster.hp);

    let player = &mut encounter.player;
    player.hit_cooldown_until = now + player.hit_cooldown_ms;
    player.anim_idle_at = Some(now + hit_anim_ms);

    let entity = EntityRef::Monster(target);
    encounter.emit(Effect::PlayAnimation {
        entity: EntityRef::Player,
        animation: Animation::Attack,
    });
    encounter.emit(Effect::HealthBar { entity, ratio });

    if killed {
        kill_monster(encounter, target);
    } else {
        encounter.emit(Effect::PlayAnimation {
            entity,
            animation: Animation::Hurt,
        });
    }

    HitOutcome::Landed { damage, killed }
}

/// Mark a monster dead, start its exit effect and check for wave completion
pub fn kill_monster(encounter: &mut Encounter, id: MonsterId) {
    let now = encounter.now_ms();
    let fade_ms = encounter.settings.death_fade_ms;
    let Some(monster) = encounter.monsters.get_mut(id) else {
        return;
    };
    if !monster.is_alive() {
        return;
    }
    monster.hp = 0;
    monster.behavior = BehaviorState::Dead;
    monster.remove_at = Some(now + fade_ms);

    if encounter.player.target == Some(id) {
        encounter.player.target = None;
    }

    let entity = EntityRef::Monster(id);
    encounter.emit(Effect::PlayAnimation {
        entity,
        animation: Animation::Death,
    });
    encounter.emit(Effect::FadeAlpha {
        entity,
        to: 0.0,
        duration_ms: fade_ms,
    });

    log::debug!(
        "Monster {:?} died, {} remaining in wave {}",
        id,
        encounter.remaining_monsters(),
        encounter.wave_index + 1
    );
    encounter.check_wave_complete();
}

/// Apply a monster attack to the player; a lethal blow ends the battle
pub fn monster_attack(encounter: &mut Encounter, attacker: MonsterId, damage: f32) {
    let now = encounter.now_ms();
    let hit_anim_ms = encounter.settings.hit_anim_ms;
    let killed = encounter.player.take_damage(damage, now);
    let ratio = encounter.player.hp_ratio();
    log::trace!(
        "Monster {:?} hit player for {} ({} hp left)",
        attacker,
        damage,
        encounter.player.hp
    );

    encounter.emit(Effect::PlayAnimation {
        entity: EntityRef::Monster(attacker),
        animation: Animation::Attack,
    });
    encounter.emit(Effect::HealthBar {
        entity: EntityRef::Player,
        ratio,
    });

    if killed {
        encounter.enter_defeat();
    } else {
        encounter.player.anim_idle_at = Some(now + hit_anim_ms);
        encounter.emit(Effect::PlayAnimation {
            entity: EntityRef::Player,
            animation: Animation::Hurt,
        });
    }
}

/// Drop the player's target if it died, vanished or left melee range
pub fn refresh_target(encounter: &mut Encounter) {
    let Some(target) = encounter.player.target else {
        return;
    };
    let melee_range = encounter.settings.melee_range_lanes;
    let keep = encounter.monsters.get(target).is_some_and(|m| {
        m.is_alive() && (m.lane - encounter.player.lane).abs() <= melee_range
    });
    if !keep {
        encounter.player.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testing::{encounter_in_fight, place_monster};

    fn monster_click(enc: &Encounter, lane: i32) -> LaneClick {
        LaneClick {
            lane,
            column: enc.settings.monster_column,
        }
    }

    #[test]
    fn landing_hit_subtracts_damage_and_starts_cooldown() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        let damage = enc.player.damage_per_hit;

        let click = monster_click(&enc, lane);
        let outcome = click_lane(&mut enc, click);
        assert_eq!(
            outcome,
            Some(HitOutcome::Landed {
                damage,
                killed: false
            })
        );
        assert_eq!(enc.monsters.get(id).unwrap().hp, 50 - damage);
        assert_eq!(enc.player.target, Some(id));
        assert_eq!(
            enc.player.hit_cooldown_until,
            enc.now_ms() + enc.player.hit_cooldown_ms
        );
    }

    #[test]
    fn hits_faster_than_cooldown_land_once() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 500);
        let cooldown = enc.player.hit_cooldown_ms;
        let damage = enc.player.damage_per_hit;

        let mut landed = 0;
        // Click every 10ms for just under one cooldown interval
        let clicks = (cooldown / 10.0) as usize;
        for _ in 0..clicks {
            if strike(&mut enc, id).landed() {
                landed += 1;
            }
            enc.advance_clock(10.0);
        }
        assert_eq!(landed, 1);
        assert_eq!(enc.monsters.get(id).unwrap().hp, 500 - damage);
    }

    #[test]
    fn invulnerable_target_takes_no_damage() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        enc.monsters.get_mut(id).unwrap().invulnerable_until = enc.now_ms() + 500.0;

        assert_eq!(strike(&mut enc, id), HitOutcome::Invulnerable);
        assert_eq!(enc.monsters.get(id).unwrap().hp, 50);
        // A rejected hit does not start the cooldown
        assert_eq!(enc.player.hit_cooldown_until, 0.0);
    }

    #[test]
    fn click_prefers_hittable_monster_in_lane() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let fading_in = place_monster(&mut enc, lane, 50);
        let ready = place_monster(&mut enc, lane, 50);
        enc.monsters.get_mut(fading_in).unwrap().invulnerable_until = enc.now_ms() + 500.0;

        let click = monster_click(&enc, lane);
        let outcome = click_lane(&mut enc, click);
        assert!(outcome.is_some_and(HitOutcome::landed));
        assert_eq!(enc.player.target, Some(ready));
        assert_eq!(enc.monsters.get(fading_in).unwrap().hp, 50);
        assert!(enc.monsters.get(ready).unwrap().hp < 50);
    }

    #[test]
    fn click_falls_back_to_shielded_monster() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        enc.monsters.get_mut(id).unwrap().invulnerable_until = enc.now_ms() + 500.0;

        let click = monster_click(&enc, lane);
        assert_eq!(click_lane(&mut enc, click), Some(HitOutcome::Invulnerable));
        assert_eq!(enc.player.target, Some(id));
    }

    #[test]
    fn out_of_range_target_is_not_hit() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane + 3;
        let id = place_monster(&mut enc, lane, 50);
        assert_eq!(strike(&mut enc, id), HitOutcome::OutOfRange);
    }

    #[test]
    fn invalid_clicks_keep_current_target() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        enc.player.target = Some(id);

        let wrong_column = LaneClick {
            lane,
            column: enc.settings.player_column,
        };
        let above = monster_click(&enc, -1);
        let below = monster_click(&enc, 99);
        let empty_lane = monster_click(&enc, 0);
        assert_eq!(click_lane(&mut enc, wrong_column), None);
        assert_eq!(click_lane(&mut enc, above), None);
        assert_eq!(click_lane(&mut enc, below), None);
        assert_eq!(click_lane(&mut enc, empty_lane), None);
        assert_eq!(enc.player.target, Some(id));
        assert_eq!(enc.monsters.get(id).unwrap().hp, 50);
    }

    #[test]
    fn kill_clears_target_and_marks_dead() {
        let mut enc = encounter_in_fight(1);
        enc.to_spawn_this_wave = 2;
        enc.spawned_this_wave = 1;
        let lane = enc.player.lane;
        let damage = enc.player.damage_per_hit;
        let id = place_monster(&mut enc, lane, damage);

        let click = monster_click(&enc, lane);
        let outcome = click_lane(&mut enc, click);
        assert_eq!(
            outcome,
            Some(HitOutcome::Landed {
                damage,
                killed: true
            })
        );
        let m = enc.monsters.get(id).unwrap();
        assert_eq!(m.behavior, BehaviorState::Dead);
        assert_eq!(m.hp, 0);
        assert!(m.remove_at.is_some());
        assert_eq!(enc.player.target, None);
        // One monster still to spawn: the wave is not over
        assert_eq!(enc.state, BattleState::Fight);
        assert_eq!(enc.remaining_monsters(), 1);

        enc.advance_clock(10_000.0);
        assert_eq!(strike(&mut enc, id), HitOutcome::TargetDead);
    }

    #[test]
    fn target_dropped_when_out_of_range() {
        let mut enc = encounter_in_fight(1);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        enc.player.target = Some(id);
        refresh_target(&mut enc);
        assert_eq!(enc.player.target, Some(id));

        enc.monsters.get_mut(id).unwrap().lane = lane + 2;
        refresh_target(&mut enc);
        assert_eq!(enc.player.target, None);
    }
}
