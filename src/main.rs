//! Wave Arena headless runner
//!
//! Plays one encounter with a simple auto-pilot at a fixed frame step and logs
//! the outcome. Usage: `wave-arena [config.json] [level] [seed]`

use wave_arena::report::{LossAck, LossReply, LossReport, LossReporter};
use wave_arena::sim::{
    AccountSnapshot, BattleState, Encounter, EncounterParams, LaneClick, MoveIntent, TickInput,
    tick,
};
use wave_arena::{BalanceTable, BattleConfig};

/// Frame step of the headless loop (60 Hz)
const FRAME_MS: f64 = 1000.0 / 60.0;
/// Give up after ten simulated minutes
const MAX_FRAMES: u32 = 60 * 60 * 10;
/// Cooldown the fake session hands out after a loss
const LOSS_COOLDOWN_MS: f64 = 30.0 * 60.0 * 1000.0;

/// Answers every loss report immediately with a fixed cooldown
struct LocalSession;

impl LossReporter for LocalSession {
    fn report_loss(&mut self, report: LossReport, reply: LossReply) {
        log::info!(
            "Session recorded loss at wave {}/{}",
            report.wave_reached,
            report.total_waves
        );
        reply.send(Ok(LossAck {
            cooldown_until_ms: Some(report.defeated_at_ms + LOSS_COOLDOWN_MS),
        }));
    }
}

/// Walk toward the closest live monster and click it when in reach
fn autopilot(encounter: &Encounter) -> TickInput {
    let player = &encounter.player;
    let Some(target) = encounter
        .monsters
        .iter()
        .filter(|m| m.is_alive())
        .min_by_key(|m| (m.lane - player.lane).abs())
    else {
        return TickInput::default();
    };

    let movement = match target.lane.cmp(&player.lane) {
        std::cmp::Ordering::Less => MoveIntent::Up,
        std::cmp::Ordering::Greater => MoveIntent::Down,
        std::cmp::Ordering::Equal => MoveIntent::Idle,
    };
    let clicks = if (target.lane - player.lane).abs() <= encounter.settings.melee_range_lanes {
        vec![LaneClick {
            lane: target.lane,
            column: encounter.settings.monster_column,
        }]
    } else {
        Vec::new()
    };

    TickInput {
        movement,
        clicks,
        exit: false,
    }
}

fn main() {
    env_logger::init();
    log::info!("Wave Arena (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => BattleConfig::load_or_default(path),
        None => BattleConfig::default(),
    };
    let level = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let balance: BalanceTable = config.balance;
    let mut encounter = Encounter::new(
        EncounterParams {
            account: AccountSnapshot {
                level,
                wins_today: 0,
                max_wins_per_day: 5,
            },
            started_at_ms: 0.0,
            seed,
        },
        config.settings,
        Box::new(balance),
        Box::new(LocalSession),
    );

    let mut last_state = encounter.state;
    for frame in 0..MAX_FRAMES {
        let mut input = autopilot(&encounter);
        input.exit = encounter.state.is_terminal();

        let output = tick(&mut encounter, &input, FRAME_MS);
        if encounter.state != last_state {
            log::debug!(
                "Frame {}: {:?} -> {:?} (wave {}/{}, {} monsters left, hp {:.0}%)",
                frame,
                last_state,
                encounter.state,
                output.hud.wave_number,
                output.hud.total_waves,
                output.hud.remaining_monsters,
                output.hud.player_hp_ratio * 100.0
            );
            last_state = encounter.state;
        }

        if let Some(outcome) = output.exit {
            let cooldown = output.hud.cooldown_text.unwrap_or_default();
            log::info!(
                "Finished: {:?}, {}/{} waves cleared, cooldown {}",
                outcome.outcome,
                outcome.waves_cleared,
                outcome.total_waves,
                cooldown
            );
            match serde_json::to_string(&outcome) {
                Ok(json) => println!("{}", json),
                Err(e) => log::error!("Failed to encode outcome: {}", e),
            }
            return;
        }
    }

    if encounter.state != BattleState::Victory && encounter.state != BattleState::Defeat {
        log::warn!("Encounter still running after {} frames", MAX_FRAMES);
    }
}
