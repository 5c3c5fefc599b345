//! Port traits: the hexagonal boundary between node logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EdgeService / ActuatorNode (domain)
//! ```
//!
//! Driven adapters (transport, notification push, event sinks, clocks)
//! implement these traits. The domain consumes them through generics, so no
//! node logic touches a socket, a timer or a pin directly.

use crate::coap::{Endpoint, Request, Response};

// ───────────────────────────────────────────────────────────────
// Request port (driven adapter: node → mesh)
// ───────────────────────────────────────────────────────────────

/// Outbound request/response exchange.
///
/// Resolves to `None` when no response arrived in time. A timeout is
/// distinct from an error status, which comes back as `Some` with a
/// 4.xx/5.xx [`Code`](crate::coap::Code).
#[allow(async_fn_in_trait)]
pub trait CoapPort {
    async fn request(&self, to: &Endpoint, request: Request) -> Option<Response>;
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: observable resource → observers)
// ───────────────────────────────────────────────────────────────

/// Push a resource's GET encoding to one observer. Fire-and-forget.
pub trait Notifier {
    fn notify(&mut self, observer: &Endpoint, resource: &str, payload: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock seconds used to stamp telemetry and predictions.
pub trait ClockPort {
    fn now_unix(&self) -> u64;
}
