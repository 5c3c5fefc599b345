//! Application core of the edge node.
//!
//! [`service`] holds the synchronous domain logic (thresholds, fusion,
//! policy, mirrors); [`runtime`] is the single async task that owns it and
//! talks to the outside world through the [`ports`].

pub mod commands;
pub mod events;
pub mod ports;
pub mod runtime;
pub mod service;
