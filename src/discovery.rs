//! Discovery client: registration, timestamp sync and peer lookup.
//!
//! ```text
//!   register ──▶ timestamp ──▶ resolve(data) ──▶ … ──▶ resolve(alarm)
//!   (once)       (once)        retry every `retry` until a prefixed ip
//! ```
//!
//! Registration and the timestamp exchange are one-shot and non-fatal.
//! Lookups are retried forever: a timeout, an error status or a malformed
//! answer all mean "not found yet".

use core::fmt;
use core::time::Duration;

use heapless::FnvIndexMap;
use log::{debug, info, warn};

use crate::actuator::ActuatorKind;
use crate::app::ports::CoapPort;
use crate::coap::payload::{decode_lookup, decode_timestamp, encode_register, lookup_query};
use crate::coap::{self, Endpoint, Request};
use crate::error::ExchangeError;

/// Registry path for both registration (POST) and the timestamp (GET).
pub const REGISTER_PATH: &str = "register";
pub const LOOKUP_PATH: &str = "lookup";

// ───────────────────────────────────────────────────────────────
// Peer table
// ───────────────────────────────────────────────────────────────

/// Remote resources the edge depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerResource {
    Data,
    Prediction,
    Furnace,
    Alarm,
}

impl PeerResource {
    /// Resolution order at startup.
    pub const ALL: [Self; 4] = [Self::Data, Self::Prediction, Self::Furnace, Self::Alarm];

    pub const fn resource(self) -> &'static str {
        match self {
            Self::Data => "res_data",
            Self::Prediction => "res_prediction",
            Self::Furnace => "res_furnace",
            Self::Alarm => "res_alarm",
        }
    }
}

impl From<ActuatorKind> for PeerResource {
    fn from(kind: ActuatorKind) -> Self {
        match kind {
            ActuatorKind::Furnace => Self::Furnace,
            ActuatorKind::Alarm => Self::Alarm,
        }
    }
}

impl fmt::Display for PeerResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

/// Resource → address. Entries are written once and never expire.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: FnvIndexMap<PeerResource, Endpoint, 4>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: PeerResource) -> Option<Endpoint> {
        self.peers.get(&resource).copied()
    }

    /// One slot per [`PeerResource`], so the full-table branch is unreachable.
    pub fn insert(&mut self, resource: PeerResource, endpoint: Endpoint) {
        if self.peers.insert(resource, endpoint).is_err() {
            warn!("Peers: table full, {} dropped", resource);
        }
    }

    pub fn is_resolved(&self, resource: PeerResource) -> bool {
        self.peers.contains_key(&resource)
    }

    pub fn all_resolved(&self) -> bool {
        PeerResource::ALL.iter().all(|r| self.is_resolved(*r))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Outcome of a successful [`DiscoveryClient::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub endpoint: Endpoint,
    /// Lookups sent, including the successful one.
    pub attempts: u32,
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

pub struct DiscoveryClient {
    registry: Endpoint,
    prefix: String,
    retry: Duration,
}

impl DiscoveryClient {
    pub fn new(registry: Endpoint, prefix: impl Into<String>, retry: Duration) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
            retry,
        }
    }

    /// Announce `node_id` and its served resources. Never retried.
    pub async fn register<P: CoapPort>(&self, port: &P, node_id: &str, resources: &[&str]) -> Result<(), ExchangeError> {
        let body = encode_register(node_id, resources).map_err(|e| {
            warn!("Discovery: registration of {} not encoded: {}", node_id, e);
            ExchangeError::Unencodable
        })?;
        let req = Request::post(REGISTER_PATH, body);
        match coap::success(port.request(&self.registry, req).await) {
            Ok(resp) => {
                info!("Discovery: {} registered ({})", node_id, resp.code);
                Ok(())
            }
            Err(e) => {
                warn!("Discovery: registration of {} failed: {}, continuing", node_id, e);
                Err(e)
            }
        }
    }

    /// Ask the registry for its current epoch. Never retried.
    pub async fn fetch_timestamp<P: CoapPort>(&self, port: &P) -> Result<u64, ExchangeError> {
        let resp = coap::success(port.request(&self.registry, Request::get(REGISTER_PATH)).await)
            .inspect_err(|e| warn!("Discovery: timestamp request failed: {}", e))?;
        decode_timestamp(&resp.payload).ok_or_else(|| {
            warn!("Discovery: unusable timestamp body {:?}", resp.payload);
            ExchangeError::BadBody
        })
    }

    /// One lookup. `None` covers timeout, error status and malformed body.
    pub async fn lookup_once<P: CoapPort>(&self, port: &P, resource: &str) -> Option<Endpoint> {
        let req = Request::get(LOOKUP_PATH).with_query(lookup_query(resource));
        match coap::success(port.request(&self.registry, req).await) {
            Ok(resp) => {
                let found = decode_lookup(&resp.payload, &self.prefix);
                if found.is_none() {
                    debug!("Discovery: {} not found yet (body {:?})", resource, resp.payload);
                }
                found
            }
            Err(e) => {
                debug!("Discovery: lookup {} failed: {}", resource, e);
                None
            }
        }
    }

    /// Look `resource` up until the registry returns a prefixed address.
    pub async fn resolve<P: CoapPort>(&self, port: &P, resource: &str) -> Resolved {
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            if let Some(endpoint) = self.lookup_once(port, resource).await {
                info!("Discovery: {} -> {} (attempt {})", resource, endpoint, attempts);
                return Resolved { endpoint, attempts };
            }
            async_io_mini::Timer::after(self.retry).await;
        }
    }

    /// Resolve every resource in order, filling `table`.
    pub async fn resolve_all<P, F>(&self, port: &P, table: &mut PeerTable, resources: &[PeerResource], mut on_resolved: F)
    where
        P: CoapPort,
        F: FnMut(PeerResource, &Resolved),
    {
        for &peer in resources {
            if table.is_resolved(peer) {
                continue;
            }
            let resolved = self.resolve(port, peer.resource()).await;
            table.insert(peer, resolved.endpoint);
            on_resolved(peer, &resolved);
        }
    }
}
