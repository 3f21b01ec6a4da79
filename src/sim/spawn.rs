//! Spawn scheduling and placement
//!
//! One monster per elapsed spawn interval, placed away from the player and
//! shielded by a grace window while it fades in.

use rand::Rng;

use super::effects::{Animation, Effect, EntityRef};
use super::state::{BattleState, BehaviorState, Encounter, Monster, MonsterId};
use crate::settings::Settings;
use crate::tile_center;

/// Lane a new monster appears in, given the player's lane
pub fn spawn_lane(settings: &Settings, player_lane: i32) -> i32 {
    let center = settings.center_lane();
    if (center - player_lane).abs() >= settings.spawn_min_separation {
        return center;
    }

    let top = settings.top_spawn_lane();
    let bottom = settings.bottom_spawn_lane();
    if (top - player_lane).abs() >= (bottom - player_lane).abs() {
        top
    } else {
        bottom
    }
}

/// Advance the spawn countdown; spawns at most one monster per tick
pub fn update_spawning(encounter: &mut Encounter, dt_ms: f64) -> Option<MonsterId> {
    if encounter.state != BattleState::Fight
        || encounter.spawned_this_wave >= encounter.to_spawn_this_wave
    {
        return None;
    }

    encounter.spawn_countdown_ms -= dt_ms;
    if encounter.spawn_countdown_ms > 0.0 {
        return None;
    }

    encounter.spawn_countdown_ms = encounter.spawn_interval_ms;
    encounter.spawned_this_wave += 1;
    Some(spawn_monster(encounter))
}

/// Create a monster for the current wave
pub fn spawn_monster(encounter: &mut Encounter) -> MonsterId {
    let now = encounter.now_ms();
    let stats = encounter.current_monster_stats();
    let level = encounter.level();
    let speed = encounter.player.move_speed
        * stats.wave_speed_multiplier
        * encounter.balance.level_speed_multiplier(level);

    let settings = &encounter.settings;
    let lane = spawn_lane(settings, encounter.player.lane);
    let pos = tile_center(settings.monster_column, lane, settings.tile_size);
    let grace_ms = settings.spawn_grace_ms;
    let patrol_direction: i8 = if encounter.rng.random_bool(0.5) { 1 } else { -1 };
    let wave_index = encounter.wave_index + 1;

    let id = encounter.monsters.insert_with(|id| Monster {
        id,
        pos,
        lane,
        hp: stats.max_hp,
        max_hp: stats.max_hp,
        damage: stats.damage,
        attack_cooldown_ms: stats.attack_cooldown_ms,
        last_attack_at: None,
        speed,
        wave_index,
        invulnerable_until: now + grace_ms,
        behavior: BehaviorState::Spawning,
        alerted: false,
        patrol_center_lane: lane,
        patrol_direction,
        remove_at: None,
    });

    log::debug!(
        "Spawned monster {:?} in lane {} (wave {}, {}/{})",
        id,
        lane,
        wave_index,
        encounter.spawned_this_wave,
        encounter.to_spawn_this_wave
    );

    let entity = EntityRef::Monster(id);
    encounter.emit(Effect::Spawn { entity, pos });
    encounter.emit(Effect::SetDepth {
        entity,
        depth: lane,
    });
    encounter.emit(Effect::SetAlpha { entity, alpha: 0.0 });
    encounter.emit(Effect::FadeAlpha {
        entity,
        to: 1.0,
        duration_ms: grace_ms,
    });
    encounter.emit(Effect::PlayAnimation {
        entity,
        animation: Animation::Idle,
    });
    encounter.emit(Effect::HealthBar { entity, ratio: 1.0 });

    id
}
