//! Outbound application events.
//!
//! The [`EdgeService`](super::service::EdgeService) and the node runtime
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them.

use crate::actuator::ActuatorKind;
use crate::coap::Endpoint;
use crate::control::policy::PredictionResult;
use crate::control::thresholds::ThresholdConfig;
use crate::discovery::PeerResource;
use crate::error::{ExchangeError, PayloadError};

/// Structured events emitted by the edge node.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started with these thresholds.
    Started(ThresholdConfig),

    /// Registry accepted the node's resources.
    Registered,

    /// Registration failed; the node carries on unregistered.
    RegistrationFailed(ExchangeError),

    /// Clock anchored to the server epoch.
    ClockSynced(u64),

    /// A peer resource address was resolved.
    PeerResolved {
        peer: PeerResource,
        endpoint: Endpoint,
        attempts: u32,
    },

    /// Observe registration on a remote actuator was attempted.
    Observing { kind: ActuatorKind, accepted: bool },

    /// One sample is fresh; the missing-data timer is running.
    FusionArmed,

    /// A prediction cycle ran.
    CycleCompleted(CycleSummary),

    /// Telemetry or prediction could not be delivered.
    PublishFailed { peer: PeerResource, error: ExchangeError },

    /// An actuation command was attempted.
    ActuationSent {
        kind: ActuatorKind,
        value: u8,
        result: Result<(), ExchangeError>,
    },

    /// A pushed actuator state was adopted into the local mirror.
    MirrorSynced { kind: ActuatorKind, value: u8 },

    /// A pushed actuator state was unusable and ignored.
    NotificationDropped { kind: ActuatorKind, error: PayloadError },

    /// Thresholds or control mode changed.
    ThresholdsUpdated(ThresholdConfig),
}

/// What one prediction cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle: u64,
    pub prediction: PredictionResult,
    pub energy_diff: i32,
    pub furnace_changed: bool,
    pub alarm_changed: bool,
}
