//! Inbound commands to the edge node task.
//!
//! Everything that reaches the edge from outside (served requests, pushed
//! actuator states, the button) arrives as an [`EdgeCommand`] on the node's
//! inbox and is handled in order by the single owning task.
//!
//! ```text
//! ┌──────────────┐  EdgeCommand  ┌──────────────┐
//! │ transport /  │──────────────▶│  edge task   │
//! │ button / sim │◀──────────────│  (runtime)   │
//! └──────────────┘  reply signal └──────────────┘
//! ```

use core::time::Duration;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::warn;

use crate::actuator::ActuatorKind;
use crate::coap::{Endpoint, Request, Response};

/// Inbox depth of the edge task.
pub const INBOX_DEPTH: usize = 8;

/// One-shot reply slot for a served request.
pub type ReplySlot = Signal<NoopRawMutex, Response>;

/// The edge task's inbox. Single-threaded, so no locking.
pub type Inbox = Channel<NoopRawMutex, EdgeCommand, INBOX_DEPTH>;

/// Commands that adapters can send into the edge task.
pub enum EdgeCommand {
    /// A request addressed to one of the edge's own resources.
    Request {
        from: Endpoint,
        request: Request,
        /// Where to deliver the response; `None` for fire-and-forget.
        reply: Option<Rc<ReplySlot>>,
    },

    /// A remote actuator pushed its state.
    Notification { kind: ActuatorKind, payload: String },

    /// The edge button was released after being held for `held`.
    ButtonReleased { held: Duration },
}

impl core::fmt::Debug for EdgeCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Request { from, request, .. } => f
                .debug_struct("Request")
                .field("from", from)
                .field("request", request)
                .finish_non_exhaustive(),
            Self::Notification { kind, payload } => f
                .debug_struct("Notification")
                .field("kind", kind)
                .field("payload", payload)
                .finish(),
            Self::ButtonReleased { held } => f.debug_struct("ButtonReleased").field("held", held).finish(),
        }
    }
}

/// Cloneable sender side of the inbox.
#[derive(Clone, Copy)]
pub struct EdgeHandle<'a> {
    inbox: &'a Inbox,
}

impl<'a> EdgeHandle<'a> {
    pub fn new(inbox: &'a Inbox) -> Self {
        Self { inbox }
    }

    /// Send a request to the edge and wait for its response.
    pub async fn request(&self, from: Endpoint, request: Request) -> Response {
        let slot = Rc::new(ReplySlot::new());
        self.inbox
            .send(EdgeCommand::Request {
                from,
                request,
                reply: Some(slot.clone()),
            })
            .await;
        slot.wait().await
    }

    /// Queue a pushed actuator state. Dropped (and logged) when the inbox
    /// is full, like any unacknowledged notification.
    pub fn notify(&self, kind: ActuatorKind, payload: &str) {
        let cmd = EdgeCommand::Notification {
            kind,
            payload: payload.to_owned(),
        };
        if self.inbox.try_send(cmd).is_err() {
            warn!("Edge: inbox full, {} notification dropped", kind);
        }
    }

    pub fn button_released(&self, held: Duration) {
        if self.inbox.try_send(EdgeCommand::ButtonReleased { held }).is_err() {
            warn!("Edge: inbox full, button event dropped");
        }
    }
}

/// Deliver `response` to whoever is waiting, if anyone.
pub fn reply(slot: Option<Rc<ReplySlot>>, response: Response) {
    if let Some(slot) = slot {
        slot.signal(response);
    }
}
