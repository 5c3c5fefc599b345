//! Edge runtime over the simulated mesh with real actuator nodes.
//!
//! Commands travel the whole way: edge PUT → node transition → observe
//! push → `EdgeNotifier` → inbox → edge mirror.

use core::time::Duration;

use futures_lite::future::block_on;

use heatmesh::actuator::{ActuatorKind, AlarmLevel, FurnaceState};
use heatmesh::adapters::sim_mesh::{self, EDGE_ADDR, POWER_ADDR, ROOF_ADDR, SimMesh, SimPort};
use heatmesh::app::commands::{EdgeCommand, EdgeHandle, Inbox};
use heatmesh::app::events::AppEvent;
use heatmesh::app::runtime::EdgeRuntime;
use heatmesh::app::service::{EdgeService, RES_POWER, RES_ROOF};
use heatmesh::coap::payload::encode_roof;
use heatmesh::coap::{Endpoint, Request};
use heatmesh::config::NodeConfig;
use heatmesh::control::policy::ControlPolicy;
use heatmesh::control::sample::RoofSample;
use heatmesh::discovery::DiscoveryClient;

use super::mock_mesh::{ConstModel, EPOCH, RecordingIndicator, RecordingNotifier, RecordingSink};

type Runtime<'a> =
    EdgeRuntime<'a, SimPort<'a>, ConstModel, RecordingIndicator<bool>, RecordingNotifier, RecordingSink>;

fn config() -> NodeConfig {
    NodeConfig {
        discovery_retry_ms: 1,
        ..NodeConfig::default()
    }
}

/// Boots both actuator nodes, then the edge. `energy_diff = 4000 - next_solar`.
fn boot<'a>(inbox: &'a Inbox, mesh: &std::rc::Rc<SimMesh<'a>>) -> Runtime<'a> {
    let config = config();
    let discovery = DiscoveryClient::new(
        config.registry_endpoint().unwrap(),
        config.mesh_prefix.clone(),
        config.discovery_retry(),
    );
    block_on(sim_mesh::run_actuators(mesh.clone(), discovery, Duration::ZERO));

    let service = EdgeService::with_parts(
        config.thresholds(),
        ControlPolicy::default(),
        ConstModel(2000.0),
        RecordingIndicator::default(),
    );
    let mut rt = EdgeRuntime::new(
        &config,
        service,
        mesh.port(EDGE_ADDR),
        RecordingNotifier::default(),
        RecordingSink::default(),
        inbox,
    )
    .unwrap();
    block_on(rt.start());
    rt
}

fn sensor_put(inbox: &Inbox, from: std::net::Ipv6Addr, request: Request) {
    inbox
        .try_send(EdgeCommand::Request {
            from: Endpoint::new(from),
            request,
            reply: None,
        })
        .unwrap();
}

/// Roof and power samples, then every push the actuators sent back.
fn cycle(rt: &mut Runtime<'_>, inbox: &Inbox, next_solar: i32) {
    let roof = encode_roof(&RoofSample {
        next_solar,
        ..RoofSample::default()
    })
    .unwrap();
    sensor_put(inbox, ROOF_ADDR, Request::put(RES_ROOF, roof));
    sensor_put(inbox, POWER_ADDR, Request::put(RES_POWER, "{\"power\":2000}"));
    block_on(rt.step());
    block_on(rt.step());
    drain(rt, inbox);
}

fn drain(rt: &mut Runtime<'_>, inbox: &Inbox) {
    while !inbox.is_empty() {
        block_on(rt.step());
    }
}

fn furnace_commands(rt: &Runtime<'_>) -> usize {
    rt.sink().count(|e| {
        matches!(
            e,
            AppEvent::ActuationSent {
                kind: ActuatorKind::Furnace,
                ..
            }
        )
    })
}

#[test]
fn cycles_reach_the_nodes_and_pushes_never_echo() {
    let inbox = Inbox::new();
    let mesh = SimMesh::new(EdgeHandle::new(&inbox), EPOCH);
    let mut rt = boot(&inbox, &mesh);

    assert!(rt.dispatcher().peers().all_resolved());
    assert_eq!(mesh.registered(), vec!["nodeFurnace", "nodoAlarm", "nodoEdge"]);
    assert!(inbox.is_empty());

    // diff 1000: furnace on, alarm stays safe.
    cycle(&mut rt, &inbox, 3000);
    assert_eq!(mesh.furnace_state(), Some(FurnaceState::On));
    assert_eq!(mesh.alarm_state(), Some(AlarmLevel::Safe));
    assert_eq!(rt.service().furnace().value(), FurnaceState::On);
    assert!(!rt.service().furnace().is_changed());

    // diff 4000: above the cut, furnace off.
    cycle(&mut rt, &inbox, 0);
    assert_eq!(mesh.alarm_state(), Some(AlarmLevel::CutRisk));
    assert_eq!(mesh.furnace_state(), Some(FurnaceState::Off));
    assert_eq!(rt.service().alarm().value(), AlarmLevel::CutRisk);
    assert_eq!(furnace_commands(&rt), 2);

    // Operator switches the furnace back on at the node.
    assert!(mesh.press_furnace_button(Duration::from_millis(100)));
    drain(&mut rt, &inbox);
    assert_eq!(rt.service().furnace().value(), FurnaceState::On);
    assert!(!rt.service().furnace().is_changed());

    // diff 2000: dead zone. Only the alarm moves; the pushed furnace state
    // is not sent back.
    cycle(&mut rt, &inbox, 2000);
    assert_eq!(mesh.alarm_state(), Some(AlarmLevel::Moderate));
    assert_eq!(mesh.furnace_state(), Some(FurnaceState::On));
    assert_eq!(furnace_commands(&rt), 2);

    // One record per collector per cycle.
    assert_eq!(rt.sink().cycles(), 3);
    let data = mesh.data_records();
    assert_eq!(data.len(), 3);
    assert!(data.iter().all(|r| r.contains("\"pow\":2000")));
    let predictions = mesh.prediction_records();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|r| r.contains("\"nPow\":4000") && r.contains("\"miss\":0")));
}
