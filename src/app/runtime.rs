//! Edge node task.
//!
//! Owns the [`EdgeService`] and every port it needs, and is the only code
//! that awaits. Startup is a fixed sequence of awaits; after that the task
//! waits on its inbox, racing the fusion deadline when one is armed.
//!
//! ```text
//!  start():  register ─▶ timestamp ─▶ resolve peers ─▶ observe actuators
//!  step():   ┌────────── Timer(fusion deadline) ──────────┐
//!            │          or  inbox.receive()               │──▶ service ──▶ dispatch
//!            └────────────────────────────────────────────┘
//! ```
//!
//! Commands that arrive during startup wait in the inbox until it is done.

use core::time::Duration;
use std::time::Instant;

use futures_lite::future;
use log::{debug, info, warn};

use crate::actuator::{ActuatorKind, Indicator};
use crate::adapters::time::EpochClock;
use crate::coap::{self, Request};
use crate::config::NodeConfig;
use crate::control::fusion::TimeoutToken;
use crate::control::policy::Predictor;
use crate::discovery::{DiscoveryClient, PeerResource};
use crate::dispatch::{DispatchPlan, Dispatcher};
use crate::error::ConfigError;

use super::commands::{EdgeCommand, Inbox, reply};
use super::events::AppEvent;
use super::ports::{CoapPort, EventSink, Notifier};
use super::service::{EDGE_RESOURCES, EdgeService, FollowUp};

/// What woke the task up.
#[derive(Debug)]
enum Wake {
    Command(EdgeCommand),
    FusionTimeout(TimeoutToken),
}

pub struct EdgeRuntime<'a, P, M, L, N, E>
where
    P: CoapPort,
    M: Predictor,
    L: Indicator<bool>,
    N: Notifier,
    E: EventSink,
{
    node_id: String,
    service: EdgeService<M, L>,
    discovery: DiscoveryClient,
    dispatcher: Dispatcher,
    clock: EpochClock,
    port: P,
    notifier: N,
    sink: E,
    inbox: &'a Inbox,
    fusion_timeout: Duration,
    deadline: Option<(TimeoutToken, Instant)>,
}

impl<'a, P, M, L, N, E> EdgeRuntime<'a, P, M, L, N, E>
where
    P: CoapPort,
    M: Predictor,
    L: Indicator<bool>,
    N: Notifier,
    E: EventSink,
{
    pub fn new(
        config: &NodeConfig,
        service: EdgeService<M, L>,
        port: P,
        notifier: N,
        sink: E,
        inbox: &'a Inbox,
    ) -> Result<Self, ConfigError> {
        let discovery = DiscoveryClient::new(
            config.registry_endpoint()?,
            config.mesh_prefix.clone(),
            config.discovery_retry(),
        );
        Ok(Self {
            node_id: config.node_id.clone(),
            service,
            discovery,
            dispatcher: Dispatcher::default(),
            clock: EpochClock::new(),
            port,
            notifier,
            sink,
            inbox,
            fusion_timeout: config.fusion_timeout(),
            deadline: None,
        })
    }

    pub fn service(&self) -> &EdgeService<M, L> {
        &self.service
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// `true` while a missing-data deadline is pending.
    pub fn deadline_armed(&self) -> bool {
        self.deadline.is_some()
    }

    // ── Startup ───────────────────────────────────────────────

    /// Register, sync the clock, resolve every peer, observe the actuators.
    /// Returns only once all peers are resolved.
    pub async fn start(&mut self) {
        self.service.start(&mut self.sink);

        match self.discovery.register(&self.port, &self.node_id, &EDGE_RESOURCES).await {
            Ok(()) => self.sink.emit(&AppEvent::Registered),
            Err(e) => self.sink.emit(&AppEvent::RegistrationFailed(e)),
        }

        if let Ok(epoch) = self.discovery.fetch_timestamp(&self.port).await {
            self.clock.sync(epoch);
            self.sink.emit(&AppEvent::ClockSynced(epoch));
        }

        let sink = &mut self.sink;
        self.discovery
            .resolve_all(&self.port, self.dispatcher.peers_mut(), &PeerResource::ALL, |peer, r| {
                sink.emit(&AppEvent::PeerResolved {
                    peer,
                    endpoint: r.endpoint,
                    attempts: r.attempts,
                });
            })
            .await;

        for kind in [ActuatorKind::Alarm, ActuatorKind::Furnace] {
            self.observe(kind).await;
        }
        info!("Edge: startup complete, {} peers resolved", self.dispatcher.peers().len());
    }

    async fn observe(&mut self, kind: ActuatorKind) {
        let Some(endpoint) = self.dispatcher.peers().get(PeerResource::from(kind)) else {
            return;
        };
        let request = Request::get(kind.resource()).observe();
        let accepted = match coap::success(self.port.request(&endpoint, request).await) {
            Ok(resp) => {
                // The registration answer carries the current state.
                self.service.on_notification(kind, &resp.payload, &mut self.sink);
                true
            }
            Err(e) => {
                warn!("Edge: observe {} at {} failed: {}", kind, endpoint, e);
                false
            }
        };
        self.sink.emit(&AppEvent::Observing { kind, accepted });
    }

    // ── Event loop ────────────────────────────────────────────

    /// Run forever: startup, then one step at a time.
    pub async fn run(mut self) {
        self.start().await;
        loop {
            self.step().await;
        }
    }

    /// Wait for the next command or deadline and handle it completely,
    /// including any dispatch it triggers.
    pub async fn step(&mut self) {
        let wake = self.next_wake().await;
        match wake {
            Wake::Command(cmd) => self.handle(cmd).await,
            Wake::FusionTimeout(token) => {
                self.deadline = None;
                let plan = self.service.on_fusion_timeout(token, &self.clock, &mut self.sink);
                if let Some(plan) = plan {
                    self.dispatch(plan).await;
                }
            }
        }
    }

    async fn next_wake(&self) -> Wake {
        let inbox = self.inbox;
        match self.deadline {
            Some((token, at)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                // `or` polls its first future first: an expired deadline wins
                // over queued commands, so a busy inbox cannot postpone it.
                future::or(
                    async move {
                        async_io_mini::Timer::after(remaining).await;
                        Wake::FusionTimeout(token)
                    },
                    async { Wake::Command(inbox.receive().await) },
                )
                .await
            }
            None => Wake::Command(inbox.receive().await),
        }
    }

    async fn handle(&mut self, cmd: EdgeCommand) {
        debug!("Edge: {:?}", cmd);
        match cmd {
            EdgeCommand::Request { from, request, reply: slot } => {
                let served = self
                    .service
                    .serve(&from, &request, &self.clock, &mut self.notifier, &mut self.sink);
                reply(slot, served.response);
                self.follow_up(served.follow_up).await;
            }
            EdgeCommand::Notification { kind, payload } => {
                self.service.on_notification(kind, &payload, &mut self.sink);
            }
            EdgeCommand::ButtonReleased { held } => {
                self.service.on_button_released(held, &mut self.notifier, &mut self.sink);
            }
        }
    }

    async fn follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::ArmTimeout(token) => {
                self.deadline = Some((token, Instant::now() + self.fusion_timeout));
            }
            FollowUp::Dispatch(plan) => {
                // Completeness fired the cycle; any pending deadline is void.
                self.deadline = None;
                self.dispatch(plan).await;
            }
        }
    }

    async fn dispatch(&mut self, plan: DispatchPlan) {
        let report = self.dispatcher.dispatch(&self.port, &plan).await;
        self.service.complete_dispatch(&plan, &report, &mut self.sink);
    }
}
