//! Simulated mesh for host runs.
//!
//! Stands in for everything outside the edge node: the registry and its
//! data/prediction collectors, the two actuator nodes, and the roof and
//! power sensors. All of it runs on the same local executor as the edge
//! task. Requests are answered in place; a request to a node that is not
//! up yet gets no answer, which callers see as a timeout.
//!
//! ```text
//!   fd00::1  registry + res_data + res_prediction
//!   fd00::2  edge
//!   fd00::3  roof sensor      ── PUT res_roof  ──▶ edge
//!   fd00::4  power sensor     ── PUT res_power ──▶ edge
//!   fd00::5  furnace node     ◀─ PUT / observe ── edge
//!   fd00::6  alarm node       ◀─ PUT / observe ── edge
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::rc::Rc;

use heapless::HistoryBuffer;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::led::{SimRgbLed, sim_rgb_led};
use crate::actuator::node::ActuatorNode;
use crate::actuator::{ActuatorKind, AlarmLevel, FurnaceState};
use crate::app::commands::EdgeHandle;
use crate::app::ports::{CoapPort, Notifier};
use crate::app::service::{RES_POWER, RES_ROOF};
use crate::coap::payload::{encode_power, encode_roof};
use crate::coap::{Code, Endpoint, Method, Request, Response};
use crate::control::sample::{PowerSample, RoofSample};
use crate::discovery::{DiscoveryClient, LOOKUP_PATH, REGISTER_PATH};

pub const REGISTRY_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1);
pub const EDGE_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 2);
pub const ROOF_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 3);
pub const POWER_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 4);
pub const FURNACE_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 5);
pub const ALARM_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 6);

/// Records kept per collector; older ones are overwritten.
pub const RECORD_HISTORY: usize = 16;

type Records = HistoryBuffer<String, RECORD_HISTORY>;

pub type SimAlarmNode = ActuatorNode<AlarmLevel, SimRgbLed>;
pub type SimFurnaceNode = ActuatorNode<FurnaceState, SimRgbLed>;

#[derive(Deserialize)]
struct RegisterBody {
    id: String,
    resources: Vec<String>,
}

// ───────────────────────────────────────────────────────────────
// Mesh
// ───────────────────────────────────────────────────────────────

pub struct SimMesh<'a> {
    edge: EdgeHandle<'a>,
    epoch: u64,
    /// Resource name (no slash) → host.
    directory: RefCell<BTreeMap<String, Endpoint>>,
    registered: RefCell<Vec<String>>,
    data: RefCell<Records>,
    predictions: RefCell<Records>,
    alarm: RefCell<Option<SimAlarmNode>>,
    furnace: RefCell<Option<SimFurnaceNode>>,
}

impl<'a> SimMesh<'a> {
    /// The collectors live on the registry host and are known from the start.
    pub fn new(edge: EdgeHandle<'a>, epoch: u64) -> Rc<Self> {
        let server = Endpoint::new(REGISTRY_ADDR);
        let mut directory = BTreeMap::new();
        directory.insert("res_data".to_owned(), server);
        directory.insert("res_prediction".to_owned(), server);
        Rc::new(Self {
            edge,
            epoch,
            directory: RefCell::new(directory),
            registered: RefCell::new(Vec::new()),
            data: RefCell::new(HistoryBuffer::new()),
            predictions: RefCell::new(HistoryBuffer::new()),
            alarm: RefCell::new(None),
            furnace: RefCell::new(None),
        })
    }

    /// Request port for the node at `local`.
    pub fn port(self: &Rc<Self>, local: Ipv6Addr) -> SimPort<'a> {
        SimPort {
            mesh: self.clone(),
            local: Endpoint::new(local),
        }
    }

    pub fn attach_alarm(&self, node: SimAlarmNode) {
        *self.alarm.borrow_mut() = Some(node);
    }

    pub fn attach_furnace(&self, node: SimFurnaceNode) {
        *self.furnace.borrow_mut() = Some(node);
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.borrow().clone()
    }

    /// Latest telemetry records, oldest first.
    pub fn data_records(&self) -> Vec<String> {
        self.data.borrow().oldest_ordered().cloned().collect()
    }

    /// Latest prediction records, oldest first.
    pub fn prediction_records(&self) -> Vec<String> {
        self.predictions.borrow().oldest_ordered().cloned().collect()
    }

    pub fn alarm_state(&self) -> Option<AlarmLevel> {
        self.alarm.borrow().as_ref().map(|n| n.resource().value())
    }

    pub fn furnace_state(&self) -> Option<FurnaceState> {
        self.furnace.borrow().as_ref().map(|n| n.resource().value())
    }

    /// Physical button on the furnace node.
    pub fn press_furnace_button(&self, held: Duration) -> bool {
        let mut notifier = EdgeNotifier { edge: self.edge };
        self.furnace
            .borrow_mut()
            .as_mut()
            .is_some_and(|n| n.on_button_released(held, &mut notifier))
    }

    fn route(&self, from: &Endpoint, to: &Endpoint, request: &Request) -> Option<Response> {
        let mut notifier = EdgeNotifier { edge: self.edge };
        match to.addr {
            REGISTRY_ADDR => Some(self.server(from, request)),
            ALARM_ADDR => self
                .alarm
                .borrow_mut()
                .as_mut()
                .map(|n| n.serve(from, request, &mut notifier)),
            FURNACE_ADDR => self
                .furnace
                .borrow_mut()
                .as_mut()
                .map(|n| n.serve(from, request, &mut notifier)),
            _ => {
                debug!("Sim: nothing at {}", to);
                None
            }
        }
    }

    fn server(&self, from: &Endpoint, request: &Request) -> Response {
        match (request.method, request.path.as_str()) {
            (Method::Post, REGISTER_PATH) => self.register(from, &request.payload),
            (Method::Get, REGISTER_PATH) => Response::content(format!("{{\"timestamp\": \"{}\"}}", self.epoch)),
            (Method::Get, LOOKUP_PATH) => {
                let wanted = request
                    .query
                    .as_deref()
                    .and_then(|q| q.strip_prefix("res="))
                    .map(|r| r.trim_start_matches('/'))
                    .unwrap_or_default();
                let ip = self
                    .directory
                    .borrow()
                    .get(wanted)
                    .map(|ep| ep.addr.to_string())
                    .unwrap_or_default();
                Response::content(format!("{{\"ip\" : \"{ip}\"}}"))
            }
            (Method::Post, "res_data") => {
                debug!("Sim data: {}", request.payload);
                self.data.borrow_mut().write(request.payload.clone());
                Response::new(Code::Created)
            }
            (Method::Post, "res_prediction") => {
                info!("Sim prediction: {}", request.payload);
                self.predictions.borrow_mut().write(request.payload.clone());
                Response::new(Code::Created)
            }
            _ => Response::new(Code::NotFound),
        }
    }

    fn register(&self, from: &Endpoint, body: &str) -> Response {
        let Ok(body) = serde_json::from_str::<RegisterBody>(body) else {
            return Response::new(Code::BadRequest);
        };
        let mut directory = self.directory.borrow_mut();
        for resource in &body.resources {
            directory.insert(resource.trim_start_matches('/').to_owned(), *from);
        }
        info!("Sim registry: {} at {} ({})", body.id, from.addr, body.resources.join(","));
        self.registered.borrow_mut().push(body.id);
        Response::new(Code::Created)
    }
}

/// [`CoapPort`] of one simulated node.
pub struct SimPort<'a> {
    mesh: Rc<SimMesh<'a>>,
    local: Endpoint,
}

impl CoapPort for SimPort<'_> {
    async fn request(&self, to: &Endpoint, request: Request) -> Option<Response> {
        self.mesh.route(&self.local, to, &request)
    }
}

/// Delivers actuator pushes addressed to the edge into its inbox.
struct EdgeNotifier<'a> {
    edge: EdgeHandle<'a>,
}

impl Notifier for EdgeNotifier<'_> {
    fn notify(&mut self, observer: &Endpoint, resource: &str, payload: &str) {
        if observer.addr != EDGE_ADDR {
            debug!("Sim: push to unknown observer {}", observer);
            return;
        }
        match ActuatorKind::from_resource(resource) {
            Some(kind) => self.edge.notify(kind, payload),
            None => warn!("Sim: push for unknown resource {}", resource),
        }
    }
}

/// Pushes from the edge's own observable resources. Nobody in the
/// simulation observes them, so they are only logged.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, observer: &Endpoint, resource: &str, payload: &str) {
        info!("Notify {} -> {}: {}", resource, observer, payload);
    }
}

// ───────────────────────────────────────────────────────────────
// Node tasks
// ───────────────────────────────────────────────────────────────

/// Bring both actuator nodes up: register, then attach to the mesh.
pub async fn run_actuators(mesh: Rc<SimMesh<'_>>, discovery: DiscoveryClient, boot_delay: Duration) {
    async_io_mini::Timer::after(boot_delay).await;

    let furnace = ActuatorNode::new("nodeFurnace", FurnaceState::Off, sim_rgb_led());
    furnace.register(&mesh.port(FURNACE_ADDR), &discovery).await;
    mesh.attach_furnace(furnace);

    let alarm = ActuatorNode::new("nodoAlarm", AlarmLevel::Safe, sim_rgb_led());
    alarm.register(&mesh.port(ALARM_ADDR), &discovery).await;
    mesh.attach_alarm(alarm);
}

/// Random walk of roof readings, roughly following the original sensor.
pub struct RoofWalk {
    rng: SmallRng,
    sample: RoofSample,
}

impl RoofWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            sample: RoofSample {
                solar: 0,
                month: 1,
                hour: 0,
                temperature: 18,
                humidity: 60,
                next_solar: 0,
            },
        }
    }

    pub fn sample(&mut self) -> RoofSample {
        let s = &mut self.sample;
        s.hour = (s.hour + 1) % 24;
        if s.hour == 0 {
            s.month = s.month % 12 + 1;
        }
        if (8..=14).contains(&s.hour) {
            s.solar += self.rng.gen_range(-300..=1000);
        } else {
            s.solar -= self.rng.gen_range(300..=1200);
        }
        s.solar = s.solar.max(0);
        s.temperature = (s.temperature + self.rng.gen_range(-2..=2)).clamp(10, 28);
        s.humidity = (s.humidity + self.rng.gen_range(-10..=10)).clamp(30, 90);
        s.next_solar = s.solar;
        *s
    }
}

/// Mean-reverting random walk of household draw.
pub struct PowerWalk {
    rng: SmallRng,
    power: i32,
    target: i32,
}

impl PowerWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            power: 3000,
            target: 2500,
        }
    }

    pub fn sample(&mut self) -> PowerSample {
        self.power += self.rng.gen_range(-1250..=1250) - (self.power - self.target) / 5;
        self.power = self.power.max(500);
        PowerSample { power: self.power }
    }
}

/// Roof sensor: one PUT every `period`.
pub async fn run_roof_sensor(edge: EdgeHandle<'_>, period: Duration, seed: u64) {
    let mut walk = RoofWalk::new(seed);
    let from = Endpoint::new(ROOF_ADDR);
    loop {
        async_io_mini::Timer::after(period).await;
        let body = match encode_roof(&walk.sample()) {
            Ok(body) => body,
            Err(e) => {
                warn!("Sim roof: {}", e);
                continue;
            }
        };
        let resp = edge.request(from, Request::put(RES_ROOF, body)).await;
        if resp.code != Code::Changed {
            warn!("Sim roof: edge answered {}", resp.code);
        }
    }
}

/// Power sensor: one PUT every `period`, skipping every `skip_every`-th
/// reading so the edge exercises its missing-data path.
pub async fn run_power_sensor(edge: EdgeHandle<'_>, period: Duration, skip_every: u32, seed: u64) {
    let mut walk = PowerWalk::new(seed);
    let from = Endpoint::new(POWER_ADDR);
    let mut tick = 0u32;
    loop {
        async_io_mini::Timer::after(period).await;
        tick = tick.wrapping_add(1);
        let sample = walk.sample();
        if skip_every > 0 && tick % skip_every == 0 {
            info!("Sim power: reading {} withheld", tick);
            continue;
        }
        let body = match encode_power(&sample) {
            Ok(body) => body,
            Err(e) => {
                warn!("Sim power: {}", e);
                continue;
            }
        };
        let resp = edge.request(from, Request::put(RES_POWER, body)).await;
        if resp.code != Code::Changed {
            warn!("Sim power: edge answered {}", resp.code);
        }
    }
}
