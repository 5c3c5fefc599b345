//! Actuator node: one canonical resource plus its startup registration.

use core::time::Duration;

use log::{info, warn};

use super::resource::ActuatorResource;
use super::{ActuatorValue, FurnaceState, Indicator, is_long_press};
use crate::app::ports::{CoapPort, Notifier};
use crate::coap::{Code, Endpoint, Method, Request, Response};
use crate::discovery::DiscoveryClient;

pub struct ActuatorNode<V: ActuatorValue, I: Indicator<V>> {
    node_id: String,
    resource: ActuatorResource<V, I>,
}

impl<V: ActuatorValue, I: Indicator<V>> ActuatorNode<V, I> {
    pub fn new(node_id: impl Into<String>, initial: V, indicator: I) -> Self {
        Self {
            node_id: node_id.into(),
            resource: ActuatorResource::new(initial, indicator),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn resource(&self) -> &ActuatorResource<V, I> {
        &self.resource
    }

    /// Announce the served resource. A failure is logged and the node keeps
    /// serving; nothing is retried.
    pub async fn register<P: CoapPort>(&self, port: &P, discovery: &DiscoveryClient) -> bool {
        discovery
            .register(port, &self.node_id, &[self.resource.name()])
            .await
            .is_ok()
    }

    /// Handle one inbound request from `from`.
    pub fn serve<N: Notifier>(&mut self, from: &Endpoint, request: &Request, notifier: &mut N) -> Response {
        if request.path != self.resource.name() {
            return Response::new(Code::NotFound);
        }
        match request.method {
            Method::Get => {
                if request.observe && !self.resource.observe(*from) {
                    return Response::new(Code::ServiceUnavailable);
                }
                self.resource.get()
            }
            Method::Put => self.resource.write(&request.payload, notifier),
            Method::Post => {
                warn!("{}: POST not allowed on {}", self.node_id, self.resource.name());
                Response::new(Code::MethodNotAllowed)
            }
        }
    }

    /// Physical override. Same transition path as a remote write.
    pub fn local_input<N: Notifier>(&mut self, value: V, notifier: &mut N) -> bool {
        self.resource.local_input(value, notifier)
    }
}

impl<I: Indicator<FurnaceState>> ActuatorNode<FurnaceState, I> {
    /// Furnace button: a short press switches on, a long press switches off.
    pub fn on_button_released<N: Notifier>(&mut self, held: Duration, notifier: &mut N) -> bool {
        let target = if is_long_press(held) {
            FurnaceState::Off
        } else {
            FurnaceState::On
        };
        info!("{}: button held {:?}, requesting {:?}", self.node_id, held, target);
        self.local_input(target, notifier)
    }
}
