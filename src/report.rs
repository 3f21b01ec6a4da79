//! Fire-and-forget loss reporting
//!
//! On defeat the encounter hands a `LossReply` to the host's `LossReporter`
//! and keeps the receiving end. The host answers whenever its request
//! finishes; the encounter polls the reply at the top of each tick and only
//! ever uses it for the overlay cooldown.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::hud::CooldownStatus;

/// Failures a reporter can hand back
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReportError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("loss report timed out")]
    Timeout,
    #[error("loss report rejected: {0}")]
    Rejected(String),
}

/// What is sent to the owning session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossReport {
    pub level: u32,
    /// 1-based wave the player fell in
    pub wave_reached: u32,
    pub total_waves: u32,
    /// Wall-clock timestamp (ms) of the defeat
    pub defeated_at_ms: f64,
}

/// Successful answer from the session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossAck {
    /// Battles are locked until this wall-clock timestamp (ms)
    pub cooldown_until_ms: Option<f64>,
}

pub type LossResult = Result<LossAck, ReportError>;

/// Sending half of a loss report reply
#[derive(Debug)]
pub struct LossReply(oneshot::Sender<LossResult>);

impl LossReply {
    /// Deliver the outcome. Returns false if the encounter is already gone.
    pub fn send(self, result: LossResult) -> bool {
        self.0.send(result).is_ok()
    }

    /// True once the encounter has dropped its receiver
    pub fn is_cancelled(&self) -> bool {
        self.0.is_closed()
    }
}

/// Host collaborator that forwards losses to the owning session
pub trait LossReporter {
    /// Must not block; answer through `reply` whenever the request completes
    fn report_loss(&mut self, report: LossReport, reply: LossReply);
}

/// Reporter that never answers; the overlay falls back to `Unknown`
#[derive(Debug, Default)]
pub struct NullReporter;

impl LossReporter for NullReporter {
    fn report_loss(&mut self, report: LossReport, _reply: LossReply) {
        log::debug!(
            "Dropping loss report for wave {}/{}",
            report.wave_reached,
            report.total_waves
        );
    }
}

/// Receiving half, owned by the encounter
#[derive(Debug)]
pub(crate) struct PendingReport(oneshot::Receiver<LossResult>);

impl PendingReport {
    pub(crate) fn channel() -> (LossReply, PendingReport) {
        let (tx, rx) = oneshot::channel();
        (LossReply(tx), PendingReport(rx))
    }

    /// Non-blocking poll. `None` while the reply is still in flight.
    pub(crate) fn poll(&mut self) -> Option<CooldownStatus> {
        match self.0.try_recv() {
            Ok(Ok(ack)) => Some(match ack.cooldown_until_ms {
                Some(until) => CooldownStatus::Until(until),
                None => CooldownStatus::Clear,
            }),
            Ok(Err(e)) => {
                log::warn!("Loss report failed: {}", e);
                Some(CooldownStatus::Unknown)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                log::warn!("Loss reporter dropped the reply without answering");
                Some(CooldownStatus::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_answered() {
        let (reply, mut pending) = PendingReport::channel();
        assert_eq!(pending.poll(), None);
        assert!(reply.send(Ok(LossAck {
            cooldown_until_ms: Some(5000.0)
        })));
        assert_eq!(pending.poll(), Some(CooldownStatus::Until(5000.0)));
    }

    #[test]
    fn failure_maps_to_unknown() {
        let (reply, mut pending) = PendingReport::channel();
        reply.send(Err(ReportError::Timeout));
        assert_eq!(pending.poll(), Some(CooldownStatus::Unknown));
    }

    #[test]
    fn dropped_reply_maps_to_unknown() {
        let (reply, mut pending) = PendingReport::channel();
        drop(reply);
        assert_eq!(pending.poll(), Some(CooldownStatus::Unknown));
    }

    #[test]
    fn ack_without_cooldown_is_clear() {
        let (reply, mut pending) = PendingReport::channel();
        reply.send(Ok(LossAck::default()));
        assert_eq!(pending.poll(), Some(CooldownStatus::Clear));
    }

    #[test]
    fn dropping_receiver_cancels_reply() {
        let (reply, pending) = PendingReport::channel();
        drop(pending);
        assert!(reply.is_cancelled());
        assert!(!reply.send(Ok(LossAck::default())));
    }
}
