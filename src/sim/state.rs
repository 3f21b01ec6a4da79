//! Encounter state and core simulation types
//!
//! Everything one battle mutates lives in `Encounter`. Monsters are held in a
//! generation-checked slot table so handles held by the player (or the host)
//! go stale instead of pointing at a reused slot.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::effects::{Animation, Effect, EntityRef};
use crate::balance::{BalanceProvider, MonsterStats, PlayerStats};
use crate::hud::ResultPayload;
use crate::report::{LossReporter, PendingReport};
use crate::settings::Settings;
use crate::{lane_of, tile_center};

/// Battle lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleState {
    /// Player stats and wave count being derived
    Prepare,
    /// Wave setup pending (resolved at the start of the next tick)
    Wave,
    /// Active combat
    Fight,
    /// Wave cleared, waiting for death effects before the next wave
    NextWave,
    Victory,
    Defeat,
}

impl BattleState {
    /// No simulation happens in terminal states
    pub fn is_terminal(self) -> bool {
        matches!(self, BattleState::Victory | BattleState::Defeat)
    }
}

/// Per-monster behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Fading in, invulnerable
    Spawning,
    Patrol,
    /// Chasing the player's lane
    Alert,
    /// Player within attack range
    Attacking,
    /// Fading out, awaiting removal
    Dead,
}

/// Generation-checked monster handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonsterId {
    pub index: u32,
    pub generation: u32,
}

/// Account data the encounter starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub level: u32,
    pub wins_today: u32,
    pub max_wins_per_day: u32,
}

/// Continuous movement intent for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveIntent {
    #[default]
    Idle,
    /// Toward lane 0
    Up,
    /// Toward the last lane
    Down,
}

impl MoveIntent {
    pub fn direction(self) -> f32 {
        match self {
            MoveIntent::Idle => 0.0,
            MoveIntent::Up => -1.0,
            MoveIntent::Down => 1.0,
        }
    }
}

/// The player entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Pixel position (x fixed to the player column)
    pub pos: Vec2,
    /// Lane derived from `pos.y`
    pub lane: i32,
    pub hp: f32,
    pub max_hp: f32,
    pub damage_per_hit: u32,
    /// Pixels per second
    pub move_speed: f32,
    pub hit_cooldown_ms: f64,
    /// Next hit lands no earlier than this timestamp
    pub hit_cooldown_until: f64,
    pub last_damage_at: Option<f64>,
    /// Current melee target (weak handle)
    pub target: Option<MonsterId>,
    /// Hit animation returns to idle at this timestamp
    #[serde(default)]
    pub anim_idle_at: Option<f64>,
    /// Regen latch: set below the threshold, cleared at the cap
    #[serde(default)]
    pub regenerating: bool,
}

impl Player {
    pub fn new(stats: PlayerStats, settings: &Settings) -> Self {
        let lane = settings.center_lane();
        Self {
            pos: tile_center(settings.player_column, lane, settings.tile_size),
            lane,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            damage_per_hit: stats.damage_per_hit,
            move_speed: stats.move_speed,
            hit_cooldown_ms: stats.hit_cooldown_ms,
            hit_cooldown_until: 0.0,
            last_damage_at: None,
            target: None,
            anim_idle_at: None,
            regenerating: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Health bar fill; zero when `max_hp` is not positive
    pub fn hp_ratio(&self) -> f32 {
        if self.max_hp > 0.0 {
            self.hp / self.max_hp
        } else {
            0.0
        }
    }

    /// Apply damage, clamped at zero. Returns true if this killed the player.
    pub fn take_damage(&mut self, amount: f32, now: f64) -> bool {
        self.hp = (self.hp - amount).max(0.0);
        self.last_damage_at = Some(now);
        self.hp <= 0.0
    }

    /// Place the player on a continuous y and refresh the lane
    pub fn set_y(&mut self, y: f32, settings: &Settings) {
        self.pos.y = y.clamp(settings.min_y(), settings.max_y());
        self.lane = lane_of(self.pos.y, settings.tile_size, settings.lane_count);
    }
}

/// A monster entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    pub pos: Vec2,
    pub lane: i32,
    pub hp: u32,
    pub max_hp: u32,
    pub damage: f32,
    pub attack_cooldown_ms: f64,
    pub last_attack_at: Option<f64>,
    /// Pixels per second while alert
    pub speed: f32,
    /// 1-based wave that spawned this monster
    pub wave_index: u32,
    pub invulnerable_until: f64,
    pub behavior: BehaviorState,
    /// Once set, never cleared
    pub alerted: bool,
    pub patrol_center_lane: i32,
    /// -1 (up) or +1 (down)
    pub patrol_direction: i8,
    /// Set on death; the slot is freed on the first tick at or after this
    pub remove_at: Option<f64>,
}

impl Monster {
    pub fn is_alive(&self) -> bool {
        self.behavior != BehaviorState::Dead
    }

    pub fn is_invulnerable(&self, now: f64) -> bool {
        now < self.invulnerable_until
    }

    pub fn hp_ratio(&self) -> f32 {
        if self.max_hp == 0 {
            return 0.0;
        }
        self.hp as f32 / self.max_hp as f32
    }

    /// Apply damage, clamped at zero. Returns true if this killed the monster.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        self.hp == 0
    }

    /// Behaviour to fall back to when out of attack range
    pub fn roaming_behavior(&self) -> BehaviorState {
        if self.alerted {
            BehaviorState::Alert
        } else {
            BehaviorState::Patrol
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    monster: Option<Monster>,
}

/// Slot table of monsters, iterated in spawn order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Occupied handles in spawn order
    order: Vec<MonsterId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a monster built from its freshly allocated handle
    pub fn insert_with(&mut self, build: impl FnOnce(MonsterId) -> Monster) -> MonsterId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = MonsterId {
            index,
            generation: slot.generation,
        };
        slot.monster = Some(build(id));
        self.order.push(id);
        id
    }

    pub fn get(&self, id: MonsterId) -> Option<&Monster> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.monster.as_ref())
    }

    pub fn get_mut(&mut self, id: MonsterId) -> Option<&mut Monster> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.monster.as_mut())
    }

    /// Free a slot. The handle (and any copy of it) goes stale.
    pub fn remove(&mut self, id: MonsterId) -> Option<Monster> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let monster = slot.monster.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.retain(|&other| other != id);
        Some(monster)
    }

    /// Handles in spawn order (snapshot, safe to mutate while walking)
    pub fn ids(&self) -> Vec<MonsterId> {
        self.order.clone()
    }

    /// Monsters in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &Monster> {
        self.order.iter().filter_map(|&id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.iter().filter(|m| m.is_alive()).count()
    }
}

/// Caller-supplied parameters for a new encounter
#[derive(Debug, Clone, Copy)]
pub struct EncounterParams {
    pub account: AccountSnapshot,
    /// Host wall-clock time (ms) at creation
    pub started_at_ms: f64,
    /// Seed for patrol variety; same seed + same inputs = same battle
    pub seed: u64,
}

/// One battle, from PREPARE to the result overlay
pub struct Encounter {
    pub state: BattleState,
    /// 0-based
    pub wave_index: u32,
    pub total_waves: u32,
    pub player: Player,
    pub monsters: Roster,
    pub spawned_this_wave: u32,
    pub to_spawn_this_wave: u32,
    pub spawn_interval_ms: f64,
    pub spawn_countdown_ms: f64,
    pub account: AccountSnapshot,
    pub settings: Settings,
    /// Present once VICTORY or DEFEAT is reached
    pub result: Option<ResultPayload>,
    pub(crate) balance: Box<dyn BalanceProvider>,
    pub(crate) reporter: Box<dyn LossReporter>,
    pub(crate) pending_report: Option<PendingReport>,
    pub(crate) next_wave_at: Option<f64>,
    pub(crate) closed: bool,
    pub(crate) rng: Pcg32,
    started_at_ms: f64,
    elapsed_ms: f64,
    effects: Vec<Effect>,
}

impl Encounter {
    /// Create an encounter. Runs PREPARE and leaves the battle in WAVE.
    ///
    /// Settings that fail `Settings::validate` are replaced by the defaults.
    pub fn new(
        params: EncounterParams,
        settings: Settings,
        balance: Box<dyn BalanceProvider>,
        reporter: Box<dyn LossReporter>,
    ) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("Invalid battle settings, using defaults: {}", e);
                Settings::default()
            }
        };
        let level = params.account.level;
        let player = Player::new(balance.player_stats(level), &settings);
        let total_waves = balance.total_waves(level).max(1);

        let mut encounter = Self {
            state: BattleState::Prepare,
            wave_index: 0,
            total_waves,
            player,
            monsters: Roster::new(),
            spawned_this_wave: 0,
            to_spawn_this_wave: 0,
            spawn_interval_ms: 0.0,
            spawn_countdown_ms: 0.0,
            account: params.account,
            settings,
            result: None,
            balance,
            reporter,
            pending_report: None,
            next_wave_at: None,
            closed: false,
            rng: Pcg32::seed_from_u64(params.seed),
            started_at_ms: params.started_at_ms,
            elapsed_ms: 0.0,
            effects: Vec::new(),
        };

        log::info!(
            "Encounter prepared: level {}, {} waves, player hp {}",
            level,
            total_waves,
            encounter.player.max_hp
        );

        let pos = encounter.player.pos;
        encounter.emit(Effect::Spawn {
            entity: EntityRef::Player,
            pos,
        });
        encounter.emit(Effect::SetDepth {
            entity: EntityRef::Player,
            depth: encounter.player.lane,
        });
        encounter.emit(Effect::PlayAnimation {
            entity: EntityRef::Player,
            animation: Animation::Idle,
        });
        encounter.emit(Effect::HealthBar {
            entity: EntityRef::Player,
            ratio: 1.0,
        });

        encounter.state = BattleState::Wave;
        encounter
    }

    /// Current wall-clock-compatible timestamp (ms)
    pub fn now_ms(&self) -> f64 {
        self.started_at_ms + self.elapsed_ms
    }

    pub(crate) fn advance_clock(&mut self, elapsed_ms: f64) {
        self.elapsed_ms += elapsed_ms;
    }

    pub fn level(&self) -> u32 {
        self.account.level
    }

    /// True once the player has exited through the result overlay
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Alive monsters plus those still to spawn this wave
    pub fn remaining_monsters(&self) -> u32 {
        let unspawned = self.to_spawn_this_wave.saturating_sub(self.spawned_this_wave);
        self.monsters.alive_count() as u32 + unspawned
    }

    /// Stats for monsters of the current wave
    pub fn current_monster_stats(&self) -> MonsterStats {
        self.balance.monster_stats(self.level(), self.wave_index)
    }

    pub(crate) fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
