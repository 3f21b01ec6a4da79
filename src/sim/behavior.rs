//! Monster AI: patrol, alert pursuit and attack timing
//!
//! Monsters are processed in spawn order. A monster attack can end the battle,
//! in which case the remaining monsters are left untouched for this tick.

use super::combat;
use super::effects::{Effect, EntityRef};
use super::state::{BattleState, BehaviorState, Encounter, MonsterId};
use crate::{approach, lane_center_y, lane_of};

/// Run one AI step for every live, vulnerable monster
pub fn update_monsters(encounter: &mut Encounter, dt_ms: f64) {
    if encounter.state != BattleState::Fight {
        return;
    }

    let dt = (dt_ms / 1000.0) as f32;
    for id in encounter.monsters.ids() {
        if encounter.state != BattleState::Fight {
            break;
        }
        update_monster(encounter, id, dt);
    }
}

fn update_monster(encounter: &mut Encounter, id: MonsterId, dt: f32) {
    let now = encounter.now_ms();
    let player_lane = encounter.player.lane;
    let player_pos = encounter.player.pos;
    let settings = &encounter.settings;
    let (tile, lanes) = (settings.tile_size, settings.lane_count);
    let (min_y, max_y) = (settings.min_y(), settings.max_y());
    let alert_radius = settings.alert_radius_lanes;
    let attack_range = settings.attack_range_px;
    let patrol_speed = settings.patrol_speed;
    let patrol_reach = settings.patrol_reach_px;

    let Some(monster) = encounter.monsters.get_mut(id) else {
        return;
    };
    if !monster.is_alive() || monster.is_invulnerable(now) {
        return;
    }

    // Alert never reverts
    if !monster.alerted && (monster.lane - player_lane).abs() <= alert_radius {
        monster.alerted = true;
        log::trace!("Monster {:?} alerted in lane {}", id, monster.lane);
    }

    if monster.pos.distance(player_pos) <= attack_range {
        monster.behavior = BehaviorState::Attacking;
        let ready = monster
            .last_attack_at
            .is_none_or(|last| now - last >= monster.attack_cooldown_ms);
        if ready {
            monster.last_attack_at = Some(now);
            let damage = monster.damage;
            combat::monster_attack(encounter, id, damage);
        }
        return;
    }

    monster.behavior = monster.roaming_behavior();
    let (target_y, speed) = if monster.alerted {
        (lane_center_y(player_lane, tile), monster.speed)
    } else {
        let patrol_lane = monster.patrol_center_lane + monster.patrol_direction as i32;
        (lane_center_y(patrol_lane, tile), patrol_speed)
    };
    let target_y = target_y.clamp(min_y, max_y);

    let new_y = approach(monster.pos.y, target_y, speed * dt).clamp(min_y, max_y);
    if !monster.alerted && (new_y - target_y).abs() < patrol_reach {
        monster.patrol_direction = -monster.patrol_direction;
    }
    if new_y == monster.pos.y {
        return;
    }

    monster.pos.y = new_y;
    monster.lane = lane_of(new_y, tile, lanes);
    let (pos, ratio) = (monster.pos, monster.hp_ratio());
    let entity = EntityRef::Monster(id);
    encounter.emit(Effect::Move { entity, pos });
    encounter.emit(Effect::HealthBar { entity, ratio });
}
