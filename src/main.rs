//! HeatMesh edge node: host entry point.
//!
//! Runs the edge runtime against an in-process simulated mesh: registry,
//! collectors, both actuator nodes and the two sensors all live on one
//! local executor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimPort (CoapPort)   LogNotifier   LogEventSink   EpochClock  │
//! │  Lamp / RgbLed (Indicator over embedded-hal pins)              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              EdgeService (pure logic)                  │    │
//! │  │  Thresholds · Fusion · Policy · Actuator mirrors       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EdgeRuntime (inbox + fusion deadline) · Dispatcher            │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, fmt, reload};

use heatmesh::adapters::led::{Lamp, SimPin};
use heatmesh::adapters::log_sink::LogEventSink;
use heatmesh::adapters::sim_mesh::{self, EDGE_ADDR, LogNotifier, SimMesh};
use heatmesh::app::commands::{EdgeHandle, Inbox};
use heatmesh::app::runtime::EdgeRuntime;
use heatmesh::app::service::EdgeService;
use heatmesh::config::NodeConfig;
use heatmesh::discovery::DiscoveryClient;

const DEFAULT_CONFIG_PATH: &str = "heatmesh.toml";
/// Level used until the configuration has been read.
const BOOT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Period of both simulated sensors.
const SENSOR_PERIOD: Duration = Duration::from_secs(15);
/// Every n-th power reading is withheld to exercise the missing-data path.
const POWER_SKIP_EVERY: u32 = 7;
const ACTUATOR_BOOT_DELAY: Duration = Duration::from_secs(2);
/// Simulated operator presses the furnace button this long after boot.
const OPERATOR_PRESS_AFTER: Duration = Duration::from_secs(90);

fn tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Console subscriber at [`BOOT_LOG_LEVEL`], plus the handle that changes
/// its level later.
fn console_subscriber() -> (impl SubscriberInitExt, LevelHandle) {
    let (filter, handle) = reload::Layer::new(BOOT_LOG_LEVEL);
    (tracing_subscriber::registry().with(filter).with(fmt::layer()), handle)
}

fn apply_level(handle: &LevelHandle, level: log::LevelFilter) -> Result<()> {
    handle
        .modify(|filter| *filter = tracing_level(level))
        .context("applying log level")?;
    log::set_max_level(level);
    Ok(())
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    // Up before config loading; the configured level is applied after it.
    let (subscriber, level) = console_subscriber();
    subscriber.init();

    // ── 2. Configuration ──────────────────────────────────────
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = NodeConfig::load(&path)
        .map_err(heatmesh::Error::from)
        .with_context(|| format!("loading {path}"))?;

    apply_level(&level, config.log_level())?;

    info!("HeatMesh edge '{}' starting", config.node_id);

    // ── 3. Simulated mesh ─────────────────────────────────────
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let inbox = Inbox::new();
    let edge = EdgeHandle::new(&inbox);
    let mesh = SimMesh::new(edge, epoch);

    let actuator_discovery = DiscoveryClient::new(
        config.registry_endpoint().map_err(heatmesh::Error::from)?,
        config.mesh_prefix.clone(),
        config.discovery_retry(),
    );

    // ── 4. Edge runtime ───────────────────────────────────────
    let service = EdgeService::new(&config, config.model, Lamp::new(SimPin::new()));
    let runtime = EdgeRuntime::new(
        &config,
        service,
        mesh.port(EDGE_ADDR),
        LogNotifier,
        LogEventSink::new(),
        &inbox,
    )
    .map_err(heatmesh::Error::from)?;

    // ── 5. Executor ───────────────────────────────────────────
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    executor.spawn(runtime.run()).detach();
    executor
        .spawn(sim_mesh::run_actuators(mesh.clone(), actuator_discovery, ACTUATOR_BOOT_DELAY))
        .detach();
    executor
        .spawn(sim_mesh::run_roof_sensor(edge, SENSOR_PERIOD, epoch))
        .detach();
    executor
        .spawn(sim_mesh::run_power_sensor(edge, SENSOR_PERIOD, POWER_SKIP_EVERY, epoch ^ 0x5eed))
        .detach();

    let operator = mesh.clone();
    executor
        .spawn(async move {
            async_io_mini::Timer::after(OPERATOR_PRESS_AFTER).await;
            operator.press_furnace_button(Duration::from_millis(400));
        })
        .detach();

    info!("System ready. Entering event loop.");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(())
}
