//! HeatMesh edge coordinator library.
//!
//! Exposes the pure-logic modules (thresholds, fusion, policy, actuator
//! state) and the async edge runtime for integration testing. The
//! transport is abstracted behind [`app::ports::CoapPort`]; the binary
//! wires it to an in-process simulated mesh.

#![deny(unused_must_use)]

pub mod actuator;
pub mod adapters;
pub mod app;
pub mod coap;
pub mod config;
pub mod control;
pub mod discovery;
pub mod dispatch;
pub mod error;

pub use error::{Error, Result};
