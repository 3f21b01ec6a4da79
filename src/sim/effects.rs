//! Side-effect requests for the rendering collaborator
//!
//! The simulation owns positions and timing; the renderer mirrors them by
//! applying these in order.

use glam::Vec2;
use serde::Serialize;

use super::state::MonsterId;
use crate::hud::ResultPayload;

/// Visual entity an effect applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityRef {
    Player,
    Monster(MonsterId),
}

/// Named animations understood by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Animation {
    Idle,
    Walk,
    Attack,
    Hurt,
    Death,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    /// Create a visual entity at a pixel position
    Spawn { entity: EntityRef, pos: Vec2 },
    /// Destroy a visual entity
    Despawn { entity: EntityRef },
    /// Write a new pixel position
    Move { entity: EntityRef, pos: Vec2 },
    SetAlpha { entity: EntityRef, alpha: f32 },
    /// Tween alpha to `to` over `duration_ms`
    FadeAlpha {
        entity: EntityRef,
        to: f32,
        duration_ms: f64,
    },
    SetDepth { entity: EntityRef, depth: i32 },
    PlayAnimation {
        entity: EntityRef,
        animation: Animation,
    },
    /// Redraw an HP bar with a fill ratio in 0.0..=1.0
    HealthBar { entity: EntityRef, ratio: f32 },
    /// Wave intro banner (1-based wave number)
    WaveBanner { wave: u32, total: u32 },
    /// Show or refresh the result overlay
    ShowResult(ResultPayload),
}
