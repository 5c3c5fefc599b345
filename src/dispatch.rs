//! Dispatcher: publishes cycle results and sends actuation commands.
//!
//! Every cycle posts telemetry to `res_data` and the prediction to
//! `res_prediction`. Actuation commands go out only for mirrors whose
//! `changed` flag was raised by the policy. All sends are best effort:
//! failures are reported, never retried.

use log::{debug, info, warn};

use crate::actuator::{ActuatorValue, AlarmLevel, FurnaceState};
use crate::app::ports::CoapPort;
use crate::coap::payload::{encode_command, encode_prediction, encode_telemetry};
use crate::coap::{self, Request};
use crate::control::policy::PredictionResult;
use crate::control::sample::{PowerSample, RoofSample};
use crate::discovery::{PeerResource, PeerTable};
use crate::error::{ExchangeError, PayloadError};

/// Everything one cycle has to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub roof: RoofSample,
    pub power: PowerSample,
    pub prediction: PredictionResult,
    /// Pending alarm command, if the mirror changed.
    pub alarm: Option<AlarmLevel>,
    /// Pending furnace command, if the mirror changed.
    pub furnace: Option<FurnaceState>,
}

/// Per-destination outcome of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub telemetry: Result<(), ExchangeError>,
    pub prediction: Result<(), ExchangeError>,
    pub alarm: Option<Result<(), ExchangeError>>,
    pub furnace: Option<Result<(), ExchangeError>>,
}

pub struct Dispatcher {
    peers: PeerTable,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(PeerTable::new())
    }
}

impl Dispatcher {
    pub fn new(peers: PeerTable) -> Self {
        Self { peers }
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerTable {
        &mut self.peers
    }

    async fn send<P: CoapPort>(&self, port: &P, peer: PeerResource, request: Request) -> Result<(), ExchangeError> {
        let endpoint = self.peers.get(peer).ok_or(ExchangeError::Unresolved)?;
        debug!("Dispatch: {:?} {} -> {}", request.method, peer, endpoint);
        coap::success(port.request(&endpoint, request).await).map(|_| ())
    }

    /// POST an encoded record to `peer`; an encoding failure sends nothing.
    async fn publish<P: CoapPort>(
        &self,
        port: &P,
        peer: PeerResource,
        body: Result<String, PayloadError>,
    ) -> Result<(), ExchangeError> {
        let body = body.map_err(|e| {
            warn!("Dispatch: {} record not encoded: {}", peer, e);
            ExchangeError::Unencodable
        })?;
        self.send(port, peer, Request::post(peer.resource(), body)).await
    }

    async fn actuate<P: CoapPort, V: ActuatorValue>(&self, port: &P, peer: PeerResource, value: V) -> Result<(), ExchangeError> {
        let result = self
            .send(port, peer, Request::put(V::KIND.resource(), encode_command(value)))
            .await;
        match result {
            Ok(()) => info!("Dispatch: {} set to {:?}", V::KIND, value),
            Err(e) => warn!("Dispatch: {} command {:?} failed: {}", V::KIND, value, e),
        }
        result
    }

    /// Send everything in `plan`, in order: telemetry, prediction, alarm,
    /// furnace. The caller clears the mirrors' `changed` flags afterwards,
    /// whatever the outcome.
    pub async fn dispatch<P: CoapPort>(&self, port: &P, plan: &DispatchPlan) -> DispatchReport {
        let telemetry = self
            .publish(
                port,
                PeerResource::Data,
                encode_telemetry(plan.prediction.timestamp, &plan.roof, &plan.power),
            )
            .await
            .inspect_err(|e| warn!("Dispatch: telemetry not delivered: {}", e));

        let prediction = self
            .publish(port, PeerResource::Prediction, encode_prediction(&plan.prediction))
            .await
            .inspect_err(|e| warn!("Dispatch: prediction not delivered: {}", e));

        let alarm = match plan.alarm {
            Some(level) => Some(self.actuate(port, PeerResource::Alarm, level).await),
            None => None,
        };
        let furnace = match plan.furnace {
            Some(state) => Some(self.actuate(port, PeerResource::Furnace, state).await),
            None => None,
        };

        DispatchReport {
            telemetry,
            prediction,
            alarm,
            furnace,
        }
    }
}
