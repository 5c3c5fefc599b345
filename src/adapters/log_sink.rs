//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one line per event with a short category tag.
//! A telemetry or dashboard adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(t) => {
                info!(
                    "START | on={} off={} auto={}",
                    t.threshold_on, t.threshold_off, t.auto_furnace_ctrl
                );
            }
            AppEvent::Registered => info!("PEER  | registered with registry"),
            AppEvent::RegistrationFailed(e) => warn!("PEER  | registration failed: {}", e),
            AppEvent::ClockSynced(epoch) => info!("CLOCK | server epoch {}", epoch),
            AppEvent::PeerResolved {
                peer,
                endpoint,
                attempts,
            } => {
                info!("PEER  | {} -> {} after {} lookup(s)", peer, endpoint, attempts);
            }
            AppEvent::Observing { kind, accepted } => {
                info!("PEER  | observe {} {}", kind, if *accepted { "OK" } else { "FAILED" });
            }
            AppEvent::FusionArmed => info!("FUSE  | waiting for counterpart"),
            AppEvent::CycleCompleted(c) => {
                info!(
                    "FUSE  | cycle={} ts={} nPow={} nSol={} diff={} miss={} | furnace{} alarm{}",
                    c.cycle,
                    c.prediction.timestamp,
                    c.prediction.next_power,
                    c.prediction.next_solar,
                    c.energy_diff,
                    u8::from(c.prediction.missing),
                    if c.furnace_changed { "*" } else { "=" },
                    if c.alarm_changed { "*" } else { "=" },
                );
            }
            AppEvent::PublishFailed { peer, error } => warn!("PUB   | {} failed: {}", peer, error),
            AppEvent::ActuationSent { kind, value, result } => match result {
                Ok(()) => info!("ACT   | {} <- {}", kind, value),
                Err(e) => warn!("ACT   | {} <- {} failed: {}", kind, value, e),
            },
            AppEvent::MirrorSynced { kind, value } => info!("ACT   | {} reported {}", kind, value),
            AppEvent::NotificationDropped { kind, error } => {
                warn!("ACT   | {} notification dropped: {}", kind, error);
            }
            AppEvent::ThresholdsUpdated(t) => {
                info!(
                    "THRES | on={} off={} auto={}",
                    t.threshold_on, t.threshold_off, t.auto_furnace_ctrl
                );
            }
        }
    }
}
