//! Edge service: the hexagonal core of the edge node.
//!
//! [`EdgeService`] owns the threshold store, the fusion controller, the
//! control policy and both actuator mirrors. It is synchronous and never
//! performs I/O itself: anything that needs the network comes back to the
//! caller as a [`FollowUp`], and side effects go through ports passed in at
//! the call site.
//!
//! ```text
//!  res_roof / res_power ──▶ ┌──────────────────────────┐ ──▶ FollowUp::Dispatch
//!  res_threshold        ──▶ │       EdgeService        │ ──▶ FollowUp::ArmTimeout
//!  notifications        ──▶ │ Thresholds · Fusion ·    │ ──▶ EventSink
//!  button               ──▶ │ Policy · Mirrors         │ ──▶ Notifier (threshold observers)
//!                           └──────────────────────────┘
//! ```

use core::time::Duration;

use heapless::Vec;
use log::{debug, info, warn};

use crate::actuator::mirror::ActuatorMirror;
use crate::actuator::resource::MAX_OBSERVERS;
use crate::actuator::{ActuatorKind, ActuatorValue, AlarmLevel, FurnaceState, Indicator, is_long_press};
use crate::coap::payload::{
    decode_power, decode_roof, decode_state, decode_threshold_update, encode_power, encode_roof,
    encode_thresholds,
};
use crate::coap::{Code, Endpoint, Method, Request, Response};
use crate::config::NodeConfig;
use crate::control::fusion::{FusedInputs, FusionController, FusionState, FusionStep, TimeoutToken};
use crate::control::policy::{ControlPolicy, PredictionResult, Predictor};
use crate::control::sample::SensorSample;
use crate::control::thresholds::{ThresholdChange, ThresholdConfig, ThresholdStore, ThresholdUpdate};
use crate::discovery::PeerResource;
use crate::dispatch::{DispatchPlan, DispatchReport};
use crate::error::PayloadError;

use super::events::{AppEvent, CycleSummary};
use super::ports::{ClockPort, EventSink, Notifier};

pub const RES_ROOF: &str = "res_roof";
pub const RES_POWER: &str = "res_power";
pub const RES_THRESHOLD: &str = "res_threshold";

/// Resources the edge announces to the registry.
pub const EDGE_RESOURCES: [&str; 3] = [RES_POWER, RES_ROOF, RES_THRESHOLD];

/// Work the caller must carry out after a synchronous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    /// Start the missing-data timer for this token.
    ArmTimeout(TimeoutToken),
    /// A cycle ran; send its results.
    Dispatch(DispatchPlan),
}

/// Response to a served request plus the work it triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub follow_up: FollowUp,
}

impl Served {
    fn reply(response: Response) -> Self {
        Self {
            response,
            follow_up: FollowUp::Nothing,
        }
    }

    fn status(code: Code) -> Self {
        Self::reply(Response::new(code))
    }
}

/// GET answer for `resource`: 2.05 with the body, or 5.00 if it could not
/// be encoded.
fn encoded(resource: &str, body: Result<String, PayloadError>) -> Response {
    match body {
        Ok(text) => Response::content(text),
        Err(e) => {
            warn!("{}: GET failed: {}", resource, e);
            Response::new(Code::InternalServerError)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// EdgeService
// ───────────────────────────────────────────────────────────────

pub struct EdgeService<M: Predictor, L: Indicator<bool>> {
    thresholds: ThresholdStore,
    fusion: FusionController,
    policy: ControlPolicy,
    model: M,
    /// Auto-control lamp.
    lamp: L,
    furnace: ActuatorMirror<FurnaceState>,
    alarm: ActuatorMirror<AlarmLevel>,
    threshold_observers: Vec<Endpoint, MAX_OBSERVERS>,
    last_prediction: Option<PredictionResult>,
    cycles: u64,
}

impl<M: Predictor, L: Indicator<bool>> EdgeService<M, L> {
    pub fn new(config: &NodeConfig, model: M, lamp: L) -> Self {
        Self::with_parts(config.thresholds(), config.policy(), model, lamp)
    }

    pub fn with_parts(thresholds: ThresholdConfig, policy: ControlPolicy, model: M, mut lamp: L) -> Self {
        lamp.show(thresholds.auto_furnace_ctrl);
        Self {
            thresholds: ThresholdStore::new(thresholds),
            fusion: FusionController::new(),
            policy,
            model,
            lamp,
            furnace: ActuatorMirror::default(),
            alarm: ActuatorMirror::default(),
            threshold_observers: Vec::new(),
            last_prediction: None,
            cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let t = self.thresholds.get();
        sink.emit(&AppEvent::Started(t));
        info!(
            "EdgeService started (on={} off={} auto={})",
            t.threshold_on, t.threshold_off, t.auto_furnace_ctrl
        );
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds.get()
    }

    pub fn fusion_state(&self) -> FusionState {
        self.fusion.state()
    }

    pub fn furnace(&self) -> &ActuatorMirror<FurnaceState> {
        &self.furnace
    }

    pub fn alarm(&self) -> &ActuatorMirror<AlarmLevel> {
        &self.alarm
    }

    pub fn last_prediction(&self) -> Option<PredictionResult> {
        self.last_prediction
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn lamp(&self) -> &L {
        &self.lamp
    }

    pub fn threshold_observers(&self) -> &[Endpoint] {
        &self.threshold_observers
    }

    // ── Served resources ──────────────────────────────────────

    /// Handle a request for one of the edge's own resources.
    pub fn serve(
        &mut self,
        from: &Endpoint,
        request: &Request,
        clock: &impl ClockPort,
        notifier: &mut impl Notifier,
        sink: &mut impl EventSink,
    ) -> Served {
        match (request.path.as_str(), request.method) {
            (RES_ROOF, Method::Get) => Served::reply(encoded(RES_ROOF, encode_roof(self.fusion.roof()))),
            (RES_POWER, Method::Get) => Served::reply(encoded(RES_POWER, encode_power(self.fusion.power()))),
            (RES_ROOF, Method::Put) => {
                self.accept_sample(RES_ROOF, decode_roof(&request.payload).map(SensorSample::Roof), clock, sink)
            }
            (RES_POWER, Method::Put) => {
                self.accept_sample(RES_POWER, decode_power(&request.payload).map(SensorSample::Power), clock, sink)
            }
            (RES_THRESHOLD, Method::Get) => {
                if request.observe {
                    self.observe_thresholds(*from);
                }
                Served::reply(encoded(RES_THRESHOLD, encode_thresholds(&self.thresholds.get())))
            }
            (RES_THRESHOLD, Method::Put) => match decode_threshold_update(&request.payload) {
                Ok(update) => match self.apply_thresholds(update, notifier, sink) {
                    Ok(_) => Served::status(Code::Changed),
                    Err(_) => Served::status(Code::BadRequest),
                },
                Err(e) => {
                    warn!("{}: rejected {:?}: {}", RES_THRESHOLD, request.payload.trim(), e);
                    Served::status(Code::BadRequest)
                }
            },
            (RES_ROOF | RES_POWER | RES_THRESHOLD, _) => Served::status(Code::MethodNotAllowed),
            _ => Served::status(Code::NotFound),
        }
    }

    fn accept_sample(
        &mut self,
        resource: &str,
        decoded: Result<SensorSample, PayloadError>,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Served {
        match decoded {
            Ok(sample) => Served {
                response: Response::new(Code::Changed),
                follow_up: self.on_sample(sample, clock, sink),
            },
            Err(e) => {
                warn!("{}: rejected sample: {}", resource, e);
                Served::status(Code::BadRequest)
            }
        }
    }

    fn observe_thresholds(&mut self, observer: Endpoint) {
        if self.threshold_observers.contains(&observer) {
            return;
        }
        if self.threshold_observers.push(observer).is_err() {
            warn!("{}: observer table full, {} refused", RES_THRESHOLD, observer);
        } else {
            info!("{}: observer {} registered", RES_THRESHOLD, observer);
        }
    }

    /// Commit a threshold update, notify observers and drive the lamp.
    pub fn apply_thresholds(
        &mut self,
        update: ThresholdUpdate,
        notifier: &mut impl Notifier,
        sink: &mut impl EventSink,
    ) -> Result<ThresholdChange, PayloadError> {
        let change = self
            .thresholds
            .apply(update)
            .inspect_err(|e| warn!("{}: update refused: {}", RES_THRESHOLD, e))?;
        if !change.any() {
            return Ok(change);
        }
        let current = self.thresholds.get();
        if change.auto_changed {
            self.lamp.show(current.auto_furnace_ctrl);
        }
        match encode_thresholds(&current) {
            Ok(body) => {
                for observer in &self.threshold_observers {
                    notifier.notify(observer, RES_THRESHOLD, &body);
                }
            }
            Err(e) => warn!("{}: observers not notified: {}", RES_THRESHOLD, e),
        }
        sink.emit(&AppEvent::ThresholdsUpdated(current));
        Ok(change)
    }

    // ── Fusion & cycles ───────────────────────────────────────

    /// Feed a decoded sample into the fusion controller.
    pub fn on_sample(&mut self, sample: SensorSample, clock: &impl ClockPort, sink: &mut impl EventSink) -> FollowUp {
        match self.fusion.on_sample(sample) {
            FusionStep::Fire(inputs) => FollowUp::Dispatch(self.run_cycle(inputs, clock, sink)),
            FusionStep::ArmTimeout(token) => {
                sink.emit(&AppEvent::FusionArmed);
                FollowUp::ArmTimeout(token)
            }
            FusionStep::Waiting => FollowUp::Nothing,
        }
    }

    /// The missing-data timer for `token` elapsed.
    pub fn on_fusion_timeout(
        &mut self,
        token: TimeoutToken,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Option<DispatchPlan> {
        let inputs = self.fusion.on_missing_timeout(token)?;
        Some(self.run_cycle(inputs, clock, sink))
    }

    fn run_cycle(&mut self, inputs: FusedInputs, clock: &impl ClockPort, sink: &mut impl EventSink) -> DispatchPlan {
        let thresholds = self.thresholds.get();
        let outcome = self.policy.evaluate(
            &self.model,
            &inputs,
            &thresholds,
            self.furnace.value(),
            self.alarm.value(),
            clock.now_unix(),
        );

        let furnace_changed = outcome.furnace.is_some_and(|f| self.furnace.set_from_policy(f));
        let alarm_changed = outcome.alarm.is_some_and(|a| self.alarm.set_from_policy(a));

        self.cycles += 1;
        self.last_prediction = Some(outcome.prediction);
        info!(
            "Cycle {}: next_power={} next_solar={} diff={} missing={}",
            self.cycles,
            outcome.prediction.next_power,
            outcome.prediction.next_solar,
            outcome.energy_diff,
            outcome.prediction.missing
        );
        sink.emit(&AppEvent::CycleCompleted(CycleSummary {
            cycle: self.cycles,
            prediction: outcome.prediction,
            energy_diff: outcome.energy_diff,
            furnace_changed,
            alarm_changed,
        }));

        DispatchPlan {
            roof: inputs.roof,
            power: inputs.power,
            prediction: outcome.prediction,
            alarm: self.alarm.pending(),
            furnace: self.furnace.pending(),
        }
    }

    /// Record the dispatch outcome and clear the flags that were attempted.
    pub fn complete_dispatch(&mut self, plan: &DispatchPlan, report: &DispatchReport, sink: &mut impl EventSink) {
        if let Err(error) = report.telemetry {
            sink.emit(&AppEvent::PublishFailed {
                peer: PeerResource::Data,
                error,
            });
        }
        if let Err(error) = report.prediction {
            sink.emit(&AppEvent::PublishFailed {
                peer: PeerResource::Prediction,
                error,
            });
        }
        if let (Some(level), Some(result)) = (plan.alarm, report.alarm) {
            self.alarm.clear_changed();
            sink.emit(&AppEvent::ActuationSent {
                kind: ActuatorKind::Alarm,
                value: level.raw(),
                result,
            });
        }
        if let (Some(state), Some(result)) = (plan.furnace, report.furnace) {
            self.furnace.clear_changed();
            sink.emit(&AppEvent::ActuationSent {
                kind: ActuatorKind::Furnace,
                value: state.raw(),
                result,
            });
        }
    }

    // ── Remote state ──────────────────────────────────────────

    /// Adopt a state pushed by a remote actuator. Never raises `changed`.
    pub fn on_notification(&mut self, kind: ActuatorKind, payload: &str, sink: &mut impl EventSink) {
        let result = match kind {
            ActuatorKind::Alarm => decode_state::<AlarmLevel>(payload).map(|v| {
                self.alarm.apply_remote(v);
                v.raw()
            }),
            ActuatorKind::Furnace => decode_state::<FurnaceState>(payload).map(|v| {
                self.furnace.apply_remote(v);
                v.raw()
            }),
        };
        match result {
            Ok(value) => {
                debug!("Notification: {} = {}", kind, value);
                sink.emit(&AppEvent::MirrorSynced { kind, value });
            }
            Err(error) => {
                warn!("Notification: {} payload {:?} dropped: {}", kind, payload.trim(), error);
                sink.emit(&AppEvent::NotificationDropped { kind, error });
            }
        }
    }

    // ── Button ────────────────────────────────────────────────

    /// Long press disables automatic furnace control, short press enables it.
    pub fn on_button_released(
        &mut self,
        held: Duration,
        notifier: &mut impl Notifier,
        sink: &mut impl EventSink,
    ) -> ThresholdChange {
        let enable = !is_long_press(held);
        info!("Button: held {:?}, auto control {}", held, if enable { "ON" } else { "OFF" });
        // A mode-only update cannot fail validation.
        self.apply_thresholds(ThresholdUpdate::auto(enable), notifier, sink)
            .unwrap_or_default()
    }
}
