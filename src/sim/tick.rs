//! Per-frame simulation tick and the battle state machine
//!
//! Stage order inside one tick is fixed: sweep finished deaths, expire
//! timers, advance the battle state, spawn, run monster AI, move the player
//! and resolve clicks, then regenerate. Later stages read what earlier ones
//! wrote.

use serde::{Deserialize, Serialize};

use super::behavior::update_monsters;
use super::combat::{self, LaneClick};
use super::effects::{Animation, Effect, EntityRef};
use super::regen::update_regen;
use super::spawn::update_spawning;
use super::state::{BattleState, BehaviorState, Encounter, MoveIntent};
use crate::hud::{BattleOutcome, CooldownStatus, HudSnapshot, Outcome, ResultPayload};
use crate::report::{LossReport, PendingReport};

/// Input gathered by the host since the previous tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Held movement direction
    pub movement: MoveIntent,
    /// Clicks already mapped to arena coordinates, oldest first
    pub clicks: Vec<LaneClick>,
    /// Player dismissed the result overlay
    pub exit: bool,
}

/// Everything the host applies after a tick
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub effects: Vec<Effect>,
    pub hud: HudSnapshot,
    /// Set exactly once, when the player leaves a finished battle
    pub exit: Option<BattleOutcome>,
}

/// Advance the encounter by `elapsed_ms` of wall-clock time
pub fn tick(encounter: &mut Encounter, input: &TickInput, elapsed_ms: f64) -> TickOutput {
    if encounter.closed {
        return TickOutput {
            effects: Vec::new(),
            hud: HudSnapshot::capture(encounter),
            exit: None,
        };
    }

    let elapsed_ms = elapsed_ms.max(0.0);
    encounter.advance_clock(elapsed_ms);
    // Movement integration is capped; timers and rates use the full elapsed time
    let dt_ms = elapsed_ms.min(encounter.settings.max_frame_ms);

    encounter.poll_loss_report();

    let mut exit = None;
    if encounter.state.is_terminal() {
        if input.exit {
            exit = Some(encounter.close());
        }
    } else {
        if input.exit {
            log::debug!("Ignoring exit request in {:?}", encounter.state);
        }
        step(encounter, input, elapsed_ms, dt_ms);
    }

    TickOutput {
        effects: encounter.take_effects(),
        hud: HudSnapshot::capture(encounter),
        exit,
    }
}

fn step(encounter: &mut Encounter, input: &TickInput, elapsed_ms: f64, dt_ms: f64) {
    sweep_dead(encounter);
    expire_timers(encounter);
    encounter.advance_battle_state();

    update_spawning(encounter, elapsed_ms);
    update_monsters(encounter, dt_ms);
    if encounter.state.is_terminal() {
        return;
    }

    move_player(encounter, input.movement, dt_ms);
    for &click in &input.clicks {
        if let Some(outcome) = combat::click_lane(encounter, click) {
            log::trace!("Click on lane {}: {:?}", click.lane, outcome);
        }
    }
    if encounter.state.is_terminal() {
        return;
    }
    combat::refresh_target(encounter);

    update_regen(encounter, elapsed_ms);
}

/// Free slots of monsters whose death effect has finished
fn sweep_dead(encounter: &mut Encounter) {
    let now = encounter.now_ms();
    for id in encounter.monsters.ids() {
        let finished = encounter
            .monsters
            .get(id)
            .and_then(|m| m.remove_at)
            .is_some_and(|at| now >= at);
        if finished && encounter.monsters.remove(id).is_some() {
            encounter.emit(Effect::Despawn {
                entity: EntityRef::Monster(id),
            });
        }
    }
}

/// One-shot timers that stand in for animation callbacks
fn expire_timers(encounter: &mut Encounter) {
    let now = encounter.now_ms();

    if encounter.player.anim_idle_at.is_some_and(|at| now >= at) {
        encounter.player.anim_idle_at = None;
        encounter.emit(Effect::PlayAnimation {
            entity: EntityRef::Player,
            animation: Animation::Idle,
        });
    }

    for id in encounter.monsters.ids() {
        let Some(monster) = encounter.monsters.get_mut(id) else {
            continue;
        };
        if monster.behavior == BehaviorState::Spawning && !monster.is_invulnerable(now) {
            monster.behavior = monster.roaming_behavior();
            encounter.emit(Effect::PlayAnimation {
                entity: EntityRef::Monster(id),
                animation: Animation::Walk,
            });
        }
    }
}

fn move_player(encounter: &mut Encounter, movement: MoveIntent, dt_ms: f64) {
    let direction = movement.direction();
    if direction == 0.0 {
        return;
    }

    let step = direction * encounter.player.move_speed * (dt_ms / 1000.0) as f32;
    let old_y = encounter.player.pos.y;
    let settings = &encounter.settings;
    encounter.player.set_y(old_y + step, settings);
    if encounter.player.pos.y == old_y {
        return;
    }

    let (pos, lane) = (encounter.player.pos, encounter.player.lane);
    encounter.emit(Effect::Move {
        entity: EntityRef::Player,
        pos,
    });
    encounter.emit(Effect::SetDepth {
        entity: EntityRef::Player,
        depth: lane,
    });
}

impl Encounter {
    /// WAVE and NEXT_WAVE transitions driven by the clock
    pub(crate) fn advance_battle_state(&mut self) {
        if self.state == BattleState::NextWave
            && self.next_wave_at.is_some_and(|at| self.now_ms() >= at)
        {
            self.next_wave_at = None;
            self.wave_index += 1;
            self.state = BattleState::Wave;
        }

        if self.state == BattleState::Wave {
            self.setup_wave();
        }
    }

    /// WAVE -> FIGHT: size the wave and reset spawn counters
    fn setup_wave(&mut self) {
        let level = self.level();
        self.to_spawn_this_wave = self.balance.wave_size(level, self.wave_index).max(1);
        self.spawned_this_wave = 0;
        self.spawn_interval_ms = self.balance.spawn_interval_ms(level);
        self.spawn_countdown_ms = self.settings.first_spawn_delay_ms;
        self.state = BattleState::Fight;

        log::info!(
            "Wave {}/{} started: {} monsters, {}ms apart",
            self.wave_index + 1,
            self.total_waves,
            self.to_spawn_this_wave,
            self.spawn_interval_ms
        );
        self.emit(Effect::WaveBanner {
            wave: self.wave_index + 1,
            total: self.total_waves,
        });
    }

    /// Detect a cleared wave. Returns true if the wave just ended.
    pub(crate) fn check_wave_complete(&mut self) -> bool {
        if self.state != BattleState::Fight
            || self.monsters.alive_count() > 0
            || self.spawned_this_wave != self.to_spawn_this_wave
        {
            return false;
        }

        if self.wave_index + 1 >= self.total_waves {
            self.enter_victory();
        } else {
            log::debug!("Wave {} cleared", self.wave_index + 1);
            self.state = BattleState::NextWave;
            self.next_wave_at = Some(self.now_ms() + self.settings.next_wave_delay_ms);
        }
        true
    }

    fn enter_victory(&mut self) {
        self.state = BattleState::Victory;
        self.player.target = None;
        let payload = ResultPayload {
            outcome: Outcome::Victory,
            wins_today: self.account.wins_today.saturating_add(1),
            max_wins_per_day: self.account.max_wins_per_day,
            cooldown: CooldownStatus::Clear,
        };
        self.result = Some(payload);
        log::info!(
            "Victory after {} waves ({}/{} wins today)",
            self.total_waves,
            payload.wins_today,
            payload.max_wins_per_day
        );
        self.emit(Effect::ShowResult(payload));
    }

    /// Enter DEFEAT and fire the loss report. The overlay is shown at once;
    /// the cooldown fills in whenever the report answers.
    pub(crate) fn enter_defeat(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = BattleState::Defeat;
        self.player.target = None;
        self.player.hp = 0.0;
        let payload = ResultPayload {
            outcome: Outcome::Defeat,
            wins_today: self.account.wins_today,
            max_wins_per_day: self.account.max_wins_per_day,
            cooldown: CooldownStatus::Pending,
        };
        self.result = Some(payload);
        log::info!(
            "Defeat in wave {}/{}",
            self.wave_index + 1,
            self.total_waves
        );
        self.emit(Effect::PlayAnimation {
            entity: EntityRef::Player,
            animation: Animation::Death,
        });
        self.emit(Effect::ShowResult(payload));

        let report = LossReport {
            level: self.level(),
            wave_reached: self.wave_index + 1,
            total_waves: self.total_waves,
            defeated_at_ms: self.now_ms(),
        };
        let (reply, pending) = PendingReport::channel();
        self.pending_report = Some(pending);
        self.reporter.report_loss(report, reply);
        // Reporters may answer synchronously
        self.poll_loss_report();
    }

    /// Merge a finished loss report into the result overlay
    pub(crate) fn poll_loss_report(&mut self) {
        let Some(pending) = self.pending_report.as_mut() else {
            return;
        };
        let Some(status) = pending.poll() else {
            return;
        };
        self.pending_report = None;
        if let Some(result) = self.result.as_mut() {
            result.cooldown = status;
            let payload = *result;
            self.emit(Effect::ShowResult(payload));
        }
    }

    /// Leave a finished battle. The encounter goes inert afterwards.
    fn close(&mut self) -> BattleOutcome {
        let outcome = if self.state == BattleState::Victory {
            Outcome::Victory
        } else {
            Outcome::Defeat
        };
        let waves_cleared = match outcome {
            Outcome::Victory => self.total_waves,
            Outcome::Defeat => self.wave_index,
        };
        self.closed = true;
        // Cancels an unanswered loss report
        self.pending_report = None;

        log::info!("Encounter exited: {:?}", outcome);
        self.emit(Effect::Despawn {
            entity: EntityRef::Player,
        });
        for id in self.monsters.ids() {
            self.emit(Effect::Despawn {
                entity: EntityRef::Monster(id),
            });
        }

        BattleOutcome {
            outcome,
            waves_cleared,
            total_waves: self.total_waves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testing::{new_encounter, place_monster};

    #[test]
    fn first_tick_sets_up_wave_one() {
        let mut enc = new_encounter(1);
        assert_eq!(enc.state, BattleState::Wave);
        let out = tick(&mut enc, &TickInput::default(), 16.0);
        assert_eq!(enc.state, BattleState::Fight);
        assert_eq!(enc.to_spawn_this_wave, 3);
        assert_eq!(enc.spawned_this_wave, 0);
        assert!(
            out.effects
                .iter()
                .any(|e| matches!(e, Effect::WaveBanner { wave: 1, total: 3 }))
        );
        assert_eq!(out.hud.remaining_monsters, 3);
    }

    #[test]
    fn spawns_follow_the_countdown() {
        let mut enc = new_encounter(1);
        let input = TickInput::default();
        tick(&mut enc, &input, 16.0);
        let first_delay = enc.settings.first_spawn_delay_ms;
        let interval = enc.spawn_interval_ms;

        // First spawn after the initial delay
        let mut elapsed = 0.0;
        while enc.spawned_this_wave == 0 {
            tick(&mut enc, &input, 50.0);
            elapsed += 50.0;
            assert!(elapsed <= first_delay + 50.0);
        }
        assert_eq!(enc.monsters.len(), 1);

        // Second spawn one interval later, never two in one tick
        let mut elapsed = 0.0;
        while enc.spawned_this_wave == 1 {
            tick(&mut enc, &input, 50.0);
            elapsed += 50.0;
        }
        assert_eq!(enc.spawned_this_wave, 2);
        assert!((elapsed - interval).abs() <= 50.0);
    }

    #[test]
    fn cleared_wave_waits_then_advances_by_one() {
        let mut enc = new_encounter(1);
        let input = TickInput::default();
        tick(&mut enc, &input, 16.0);
        enc.spawned_this_wave = enc.to_spawn_this_wave;
        let lane = enc.settings.top_spawn_lane();
        let id = place_monster(&mut enc, lane, 1);

        combat::kill_monster(&mut enc, id);
        assert_eq!(enc.state, BattleState::NextWave);
        assert_eq!(enc.wave_index, 0);

        let delay = enc.settings.next_wave_delay_ms;
        tick(&mut enc, &input, delay - 100.0);
        assert_eq!(enc.state, BattleState::NextWave);

        tick(&mut enc, &input, 100.0);
        assert_eq!(enc.wave_index, 1);
        assert_eq!(enc.state, BattleState::Fight);
        assert_eq!(enc.spawned_this_wave, 0);
        // Dead monster was swept once its fade finished
        assert!(enc.monsters.is_empty());
    }

    #[test]
    fn final_wave_clear_is_victory() {
        let mut enc = new_encounter(1);
        let input = TickInput::default();
        tick(&mut enc, &input, 16.0);
        enc.wave_index = enc.total_waves - 1;
        enc.spawned_this_wave = enc.to_spawn_this_wave;
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 10);
        enc.player.damage_per_hit = 10;

        let click = LaneClick {
            lane,
            column: enc.settings.monster_column,
        };
        let out = tick(
            &mut enc,
            &TickInput {
                clicks: vec![click],
                ..Default::default()
            },
            16.0,
        );
        assert_eq!(enc.state, BattleState::Victory);
        assert_eq!(enc.monsters.get(id).unwrap().behavior, BehaviorState::Dead);
        assert!(enc.next_wave_at.is_none());
        let result = out.hud.result.unwrap();
        assert_eq!(result.outcome, Outcome::Victory);
        assert_eq!(result.wins_today, enc.account.wins_today + 1);
        assert_eq!(result.cooldown, CooldownStatus::Clear);
    }

    #[test]
    fn terminal_states_freeze_simulation() {
        let mut enc = new_encounter(1);
        tick(&mut enc, &TickInput::default(), 16.0);
        let lane = enc.player.lane;
        let id = place_monster(&mut enc, lane, 50);
        enc.player.hp = 1.0;
        tick(&mut enc, &TickInput::default(), 16.0);
        assert_eq!(enc.state, BattleState::Defeat);

        let y = enc.player.pos.y;
        let spawned = enc.spawned_this_wave;
        let input = TickInput {
            movement: MoveIntent::Down,
            clicks: vec![LaneClick {
                lane,
                column: enc.settings.monster_column,
            }],
            exit: false,
        };
        for _ in 0..100 {
            let out = tick(&mut enc, &input, 100.0);
            assert!(out.hud.cooldown_text.is_some());
        }
        assert_eq!(enc.player.pos.y, y);
        assert_eq!(enc.player.hp, 0.0);
        assert_eq!(enc.spawned_this_wave, spawned);
        assert_eq!(enc.monsters.get(id).unwrap().hp, 50);
    }

    #[test]
    fn exit_only_from_result_overlay() {
        let mut enc = new_encounter(1);
        let exit = TickInput {
            exit: true,
            ..Default::default()
        };
        let out = tick(&mut enc, &exit, 16.0);
        assert!(out.exit.is_none());
        assert!(!enc.is_closed());

        enc.wave_index = enc.total_waves - 1;
        enc.spawned_this_wave = enc.to_spawn_this_wave;
        assert!(enc.check_wave_complete());
        assert_eq!(enc.state, BattleState::Victory);

        let out = tick(&mut enc, &exit, 16.0);
        let outcome = out.exit.unwrap();
        assert_eq!(outcome.outcome, Outcome::Victory);
        assert_eq!(outcome.waves_cleared, enc.total_waves);
        assert!(enc.is_closed());

        // Inert afterwards
        let out = tick(&mut enc, &exit, 16.0);
        assert!(out.exit.is_none());
        assert!(out.effects.is_empty());
    }

    #[test]
    fn movement_clamps_to_arena() {
        let mut enc = new_encounter(1);
        let input = TickInput {
            movement: MoveIntent::Up,
            ..Default::default()
        };
        for _ in 0..500 {
            tick(&mut enc, &input, 50.0);
            if enc.state.is_terminal() {
                break;
            }
        }
        assert_eq!(enc.player.lane, 0);
        assert_eq!(enc.player.pos.y, enc.settings.min_y());
    }

    #[test]
    fn slow_frames_keep_spawn_timing() {
        let mut enc = new_encounter(1);
        let input = TickInput::default();
        tick(&mut enc, &input, 16.0);
        let start = enc.now_ms();
        let first_delay = enc.settings.first_spawn_delay_ms;

        while enc.spawned_this_wave == 0 {
            tick(&mut enc, &input, 250.0);
        }
        // The setup tick already counted its own 16ms
        let waited = enc.now_ms() - start;
        assert!(waited >= first_delay - 16.0 && waited < first_delay + 250.0);
    }

    #[test]
    fn slow_frames_keep_regen_rate() {
        let mut enc = new_encounter(1);
        tick(&mut enc, &TickInput::default(), 16.0);
        enc.spawned_this_wave = enc.to_spawn_this_wave;
        let lane = enc.settings.top_spawn_lane() - 1;
        place_monster(&mut enc, lane.max(0), 50);
        enc.player.hp = 40.0;
        let max_frame = enc.settings.max_frame_ms;

        let before = enc.player.hp;
        tick(&mut enc, &TickInput::default(), max_frame * 5.0);
        let slow = enc.player.hp - before;

        let before = enc.player.hp;
        for _ in 0..5 {
            tick(&mut enc, &TickInput::default(), max_frame);
        }
        let fast = enc.player.hp - before;
        assert!(slow > 0.0);
        assert!((slow - fast).abs() < 1e-3, "slow {slow} fast {fast}");
    }

    #[test]
    fn stalled_frame_is_capped_for_integration_only() {
        let mut enc = new_encounter(1);
        tick(&mut enc, &TickInput::default(), 16.0);
        let before = enc.now_ms();
        let y = enc.player.pos.y;
        let input = TickInput {
            movement: MoveIntent::Down,
            ..Default::default()
        };
        tick(&mut enc, &input, 5_000.0);
        assert_eq!(enc.now_ms(), before + 5_000.0);
        let max_step = enc.player.move_speed * (enc.settings.max_frame_ms / 1000.0) as f32;
        assert!(enc.player.pos.y - y <= max_step + 1e-3);
    }
}
