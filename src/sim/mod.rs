//! Tick-driven battle simulation
//!
//! All gameplay logic lives here. Single-threaded and deterministic for a
//! given seed and input sequence:
//! - One `tick` per rendered frame
//! - Absolute timestamps for cooldowns and windows
//! - Monsters processed in spawn order
//! - No rendering; visuals leave as `Effect` requests

pub mod behavior;
pub mod combat;
pub mod effects;
pub mod regen;
pub mod spawn;
pub mod state;
pub mod tick;

pub use combat::{HitOutcome, LaneClick};
pub use effects::{Animation, Effect, EntityRef};
pub use spawn::spawn_lane;
pub use state::{
    AccountSnapshot, BattleState, BehaviorState, Encounter, EncounterParams, Monster, MonsterId,
    MoveIntent, Player, Roster,
};
pub use tick::{TickInput, TickOutput, tick};
