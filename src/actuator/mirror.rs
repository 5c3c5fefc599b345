//! Edge-side mirror of a remote actuator.
//!
//! Two writers, two rules:
//! - the control policy writes through [`ActuatorMirror::set_from_policy`],
//!   which raises `changed` so the dispatcher sends a command;
//! - remote notifications write through [`ActuatorMirror::apply_remote`],
//!   which never raises `changed`. A pushed state must not echo back out.

use log::debug;

use super::ActuatorValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorMirror<V: ActuatorValue> {
    value: V,
    changed: bool,
}

impl<V: ActuatorValue> Default for ActuatorMirror<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: ActuatorValue> ActuatorMirror<V> {
    pub fn new(initial: V) -> Self {
        Self {
            value: initial,
            changed: false,
        }
    }

    pub fn value(&self) -> V {
        self.value
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Commit a policy target. Returns `true` on a transition.
    pub fn set_from_policy(&mut self, target: V) -> bool {
        if target == self.value {
            return false;
        }
        debug!("Mirror[{}]: {:?} -> {:?} (policy)", V::KIND, self.value, target);
        self.value = target;
        self.changed = true;
        true
    }

    /// Adopt the state pushed by the actuator node. Leaves `changed` alone.
    pub fn apply_remote(&mut self, value: V) {
        if value != self.value {
            debug!("Mirror[{}]: {:?} -> {:?} (remote)", V::KIND, self.value, value);
        }
        self.value = value;
    }

    /// Value awaiting dispatch, if any.
    pub fn pending(&self) -> Option<V> {
        self.changed.then_some(self.value)
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }
}
