//! Mock mesh adapters for integration tests.
//!
//! Records every outbound request, notification, event and indicator call
//! so tests can assert on the full history without a transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::Ipv6Addr;

use heatmesh::actuator::Indicator;
use heatmesh::app::events::AppEvent;
use heatmesh::app::ports::{ClockPort, CoapPort, EventSink, Notifier};
use heatmesh::coap::{Code, Endpoint, Method, Request, Response};
use heatmesh::control::policy::{FEATURE_COUNT, Predictor};

// ── Addresses ─────────────────────────────────────────────────

pub const REGISTRY: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1);
pub const FURNACE: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 5);
pub const ALARM: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 6);
pub const SENSOR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 3);

pub const EPOCH: u64 = 1_700_000_000;

pub fn ep(addr: Ipv6Addr) -> Endpoint {
    Endpoint::new(addr)
}

// ── MockPort ──────────────────────────────────────────────────

/// Request port that answers scripted responses first, then behaves like a
/// healthy mesh: registry and collectors on `REGISTRY`, actuators on
/// `FURNACE` and `ALARM`.
pub struct MockPort {
    pub sent: RefCell<Vec<(Endpoint, Request)>>,
    scripted: RefCell<VecDeque<Option<Response>>>,
    /// Requests to these endpoints time out.
    pub dead: RefCell<Vec<Endpoint>>,
    pub alarm_state: RefCell<String>,
    pub furnace_state: RefCell<String>,
}

#[allow(dead_code)]
impl MockPort {
    pub fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            scripted: RefCell::new(VecDeque::new()),
            dead: RefCell::new(Vec::new()),
            alarm_state: RefCell::new("0".to_owned()),
            furnace_state: RefCell::new("{\"furnace_state\":0}".to_owned()),
        }
    }

    pub fn scripted(answers: Vec<Option<Response>>) -> Self {
        let port = Self::new();
        *port.scripted.borrow_mut() = answers.into();
        port
    }

    pub fn kill(&self, endpoint: Endpoint) {
        self.dead.borrow_mut().push(endpoint);
    }

    /// Requests sent to `path`, in order.
    pub fn sent_to(&self, path: &str) -> Vec<Request> {
        self.sent
            .borrow()
            .iter()
            .filter(|(_, r)| r.path == path)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }

    fn lookup(&self, query: Option<&str>) -> Response {
        let ip = match query.and_then(|q| q.strip_prefix("res=/")) {
            Some("res_data" | "res_prediction") => REGISTRY.to_string(),
            Some("res_furnace") => FURNACE.to_string(),
            Some("res_alarm") => ALARM.to_string(),
            _ => String::new(),
        };
        Response::content(format!("{{\"ip\" : \"{ip}\"}}"))
    }

    fn healthy(&self, to: &Endpoint, request: &Request) -> Option<Response> {
        let resp = match (to.addr, request.method, request.path.as_str()) {
            (REGISTRY, Method::Post, "register") => Response::new(Code::Created),
            (REGISTRY, Method::Get, "register") => Response::content(format!("{{\"timestamp\": \"{EPOCH}\"}}")),
            (REGISTRY, Method::Get, "lookup") => self.lookup(request.query.as_deref()),
            (REGISTRY, Method::Post, "res_data" | "res_prediction") => Response::new(Code::Created),
            (ALARM, Method::Get, "res_alarm") => Response::content(self.alarm_state.borrow().clone()),
            (FURNACE, Method::Get, "res_furnace") => Response::content(self.furnace_state.borrow().clone()),
            (ALARM, Method::Put, "res_alarm") | (FURNACE, Method::Put, "res_furnace") => Response::new(Code::Changed),
            _ => Response::new(Code::NotFound),
        };
        Some(resp)
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl CoapPort for MockPort {
    async fn request(&self, to: &Endpoint, request: Request) -> Option<Response> {
        self.sent.borrow_mut().push((*to, request.clone()));
        if let Some(answer) = self.scripted.borrow_mut().pop_front() {
            return answer;
        }
        if self.dead.borrow().contains(to) {
            return None;
        }
        self.healthy(to, &request)
    }
}

// ── Notifier ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Push {
    pub observer: Endpoint,
    pub resource: String,
    pub payload: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub pushes: Vec<Push>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, observer: &Endpoint, resource: &str, payload: &str) {
        self.pushes.push(Push {
            observer: *observer,
            resource: resource.to_owned(),
            payload: payload.to_owned(),
        });
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn cycles(&self) -> usize {
        self.count(|e| matches!(e, AppEvent::CycleCompleted(_)))
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Indicator ─────────────────────────────────────────────────

/// Records every value shown.
#[derive(Debug, Default)]
pub struct RecordingIndicator<V> {
    pub shown: Vec<V>,
}

impl<V> Indicator<V> for RecordingIndicator<V> {
    fn show(&mut self, value: V) {
        self.shown.push(value);
    }
}

// ── Clock / model ─────────────────────────────────────────────

pub struct FixedClock(pub u64);

impl ClockPort for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

/// Model that always predicts the same raw value.
#[derive(Debug, Clone, Copy)]
pub struct ConstModel(pub f32);

impl Predictor for ConstModel {
    fn predict(&self, _: &[f32; FEATURE_COUNT]) -> f32 {
        self.0
    }
}
