//! Canonical actuator state, as served by an actuator node.
//!
//! Every transition, whether from a remote write or a physical input, takes
//! the same path: indicator first, then the stored value, then one push per
//! registered observer. A write equal to the current value is accepted but
//! is not a transition.

use heapless::Vec;
use log::{debug, info, warn};

use super::{ActuatorValue, Indicator};
use crate::app::ports::Notifier;
use crate::coap::payload::{decode_command, encode_state};
use crate::coap::{Code, Endpoint, Response};

/// Observer slots per resource.
pub const MAX_OBSERVERS: usize = 4;

pub struct ActuatorResource<V: ActuatorValue, I: Indicator<V>> {
    value: V,
    indicator: I,
    observers: Vec<Endpoint, MAX_OBSERVERS>,
}

impl<V: ActuatorValue, I: Indicator<V>> ActuatorResource<V, I> {
    /// Create the resource and put the indicator into the initial state.
    pub fn new(initial: V, mut indicator: I) -> Self {
        indicator.show(initial);
        Self {
            value: initial,
            indicator,
            observers: Vec::new(),
        }
    }

    pub fn value(&self) -> V {
        self.value
    }

    /// Resource path, e.g. `res_alarm`.
    pub fn name(&self) -> &'static str {
        V::KIND.resource()
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn observers(&self) -> &[Endpoint] {
        &self.observers
    }

    /// Register an observer. Re-registering is a no-op; returns `false`
    /// only when every slot is taken.
    pub fn observe(&mut self, observer: Endpoint) -> bool {
        if self.observers.contains(&observer) {
            return true;
        }
        match self.observers.push(observer) {
            Ok(()) => {
                info!("{}: observer {} registered", self.name(), observer);
                true
            }
            Err(_) => {
                warn!("{}: observer table full, {} refused", self.name(), observer);
                false
            }
        }
    }

    /// GET: current value in the resource's state encoding.
    pub fn get(&self) -> Response {
        Response::content(encode_state(self.value))
    }

    /// PUT: validate, then transition. Invalid payloads leave everything
    /// untouched and answer 4.00.
    pub fn write<N: Notifier>(&mut self, payload: &str, notifier: &mut N) -> Response {
        match decode_command::<V>(payload) {
            Ok(value) => {
                self.transition(value, notifier);
                Response::new(Code::Changed)
            }
            Err(e) => {
                warn!("{}: rejected write {:?}: {}", self.name(), payload.trim(), e);
                Response::new(Code::BadRequest)
            }
        }
    }

    /// Physical input (button). Returns `true` on a transition.
    pub fn local_input<N: Notifier>(&mut self, value: V, notifier: &mut N) -> bool {
        self.transition(value, notifier)
    }

    fn transition<N: Notifier>(&mut self, value: V, notifier: &mut N) -> bool {
        if value == self.value {
            debug!("{}: {:?} unchanged", self.name(), value);
            return false;
        }
        self.indicator.show(value);
        info!("{}: {:?} -> {:?}", self.name(), self.value, value);
        self.value = value;

        let body = encode_state(value);
        for observer in &self.observers {
            notifier.notify(observer, V::KIND.resource(), &body);
        }
        true
    }
}
