//! Actuator nodes: writes, observers, buttons and registration.

use core::time::Duration;

use futures_lite::future::block_on;

use heatmesh::actuator::node::ActuatorNode;
use heatmesh::actuator::{AlarmLevel, FurnaceState};
use heatmesh::adapters::led::{Colour, sim_rgb_led};
use heatmesh::coap::{Code, Request};
use heatmesh::discovery::DiscoveryClient;

use super::mock_mesh::{
    MockPort, REGISTRY, RecordingIndicator, RecordingNotifier, RecordingSink, SENSOR, ep,
};

fn furnace() -> ActuatorNode<FurnaceState, RecordingIndicator<FurnaceState>> {
    ActuatorNode::new("nodeFurnace", FurnaceState::Off, RecordingIndicator::default())
}

fn alarm() -> ActuatorNode<AlarmLevel, RecordingIndicator<AlarmLevel>> {
    ActuatorNode::new("nodoAlarm", AlarmLevel::Safe, RecordingIndicator::default())
}

/// Edge observes the node.
fn observed<V, I>(node: &mut ActuatorNode<V, I>, resource: &str) -> RecordingNotifier
where
    V: heatmesh::actuator::ActuatorValue,
    I: heatmesh::actuator::Indicator<V>,
{
    let mut n = RecordingNotifier::default();
    let resp = node.serve(&ep(SENSOR), &Request::get(resource).observe(), &mut n);
    assert_eq!(resp.code, Code::Content);
    n
}

// ── Out-of-domain writes ─────────────────────────────────────

#[test]
fn furnace_rejects_value_two_without_side_effects() {
    let mut node = furnace();
    let mut n = observed(&mut node, "res_furnace");

    let resp = node.serve(&ep(SENSOR), &Request::put("res_furnace", "{\"furnace_state\": 2}"), &mut n);

    assert_eq!(resp.code, Code::BadRequest);
    assert_eq!(node.resource().value(), FurnaceState::Off);
    assert!(n.pushes.is_empty(), "no notification on rejection");
    assert_eq!(node.resource().indicator().shown, vec![FurnaceState::Off]);
}

#[test]
fn alarm_rejects_malformed_and_wrong_field() {
    let mut node = alarm();
    let mut n = observed(&mut node, "res_alarm");
    for body in ["{\"alarm_state\": 4}", "{\"alarm_state\": -1}", "{\"furnace_state\": 1}", "3", ""] {
        let resp = node.serve(&ep(SENSOR), &Request::put("res_alarm", body), &mut n);
        assert_eq!(resp.code, Code::BadRequest, "body {:?}", body);
    }
    assert_eq!(node.resource().value(), AlarmLevel::Safe);
    assert!(n.pushes.is_empty());
}

// ── Transitions ──────────────────────────────────────────────

#[test]
fn transition_drives_indicator_and_notifies_each_observer_once() {
    let mut node = alarm();
    let mut n = observed(&mut node, "res_alarm");
    node.serve(&ep(REGISTRY), &Request::get("res_alarm").observe(), &mut n);

    let resp = node.serve(&ep(SENSOR), &Request::put("res_alarm", "{\"alarm_state\":3}"), &mut n);

    assert_eq!(resp.code, Code::Changed);
    assert_eq!(node.resource().value(), AlarmLevel::CutRisk);
    assert_eq!(node.resource().indicator().shown, vec![AlarmLevel::Safe, AlarmLevel::CutRisk]);
    let targets: Vec<_> = n.pushes.iter().map(|p| p.observer).collect();
    assert_eq!(targets, vec![ep(SENSOR), ep(REGISTRY)]);
    assert!(n.pushes.iter().all(|p| p.resource == "res_alarm" && p.payload == "3"));
}

#[test]
fn repeated_write_is_idempotent() {
    let mut node = furnace();
    let mut n = observed(&mut node, "res_furnace");
    let put = Request::put("res_furnace", "{\"furnace_state\":1}");

    assert_eq!(node.serve(&ep(SENSOR), &put, &mut n).code, Code::Changed);
    assert_eq!(node.serve(&ep(SENSOR), &put, &mut n).code, Code::Changed);

    assert_eq!(n.pushes.len(), 1);
    assert_eq!(n.pushes[0].payload, "{\"furnace_state\":1}");
    assert_eq!(node.resource().indicator().shown, vec![FurnaceState::Off, FurnaceState::On]);
}

#[test]
fn furnace_button_uses_the_same_path() {
    let mut node = furnace();
    let mut n = observed(&mut node, "res_furnace");

    assert!(node.on_button_released(Duration::from_millis(250), &mut n));
    assert!(!node.on_button_released(Duration::from_millis(250), &mut n));
    assert!(node.on_button_released(Duration::from_secs(3), &mut n));

    let payloads: Vec<_> = n.pushes.iter().map(|p| p.payload.as_str()).collect();
    assert_eq!(payloads, vec!["{\"furnace_state\":1}", "{\"furnace_state\":0}"]);
}

// ── Push → edge mirror ───────────────────────────────────────

#[test]
fn pushes_sync_the_edge_mirror_without_echo() {
    use heatmesh::actuator::ActuatorKind;
    use heatmesh::app::service::EdgeService;
    use heatmesh::control::policy::{ControlPolicy, LinearModel};
    use heatmesh::control::thresholds::ThresholdConfig;

    let mut edge = EdgeService::with_parts(
        ThresholdConfig::default(),
        ControlPolicy::default(),
        LinearModel::default(),
        RecordingIndicator::<bool>::default(),
    );
    let mut sink = RecordingSink::default();
    let mut node = furnace();
    let mut n = observed(&mut node, "res_furnace");

    node.on_button_released(Duration::from_millis(100), &mut n);
    for push in &n.pushes {
        edge.on_notification(ActuatorKind::Furnace, &push.payload, &mut sink);
    }

    assert_eq!(edge.furnace().value(), FurnaceState::On);
    assert!(!edge.furnace().is_changed());
}

// ── LEDs ─────────────────────────────────────────────────────

#[test]
fn alarm_led_follows_writes() {
    let mut node = ActuatorNode::new("nodoAlarm", AlarmLevel::Safe, sim_rgb_led());
    let mut n = RecordingNotifier::default();
    assert_eq!(node.resource().indicator().current(), Colour::BLUE);

    node.serve(&ep(SENSOR), &Request::put("res_alarm", "{\"alarm_state\":2}"), &mut n);
    assert_eq!(node.resource().indicator().current(), Colour::RED);

    node.serve(&ep(SENSOR), &Request::put("res_alarm", "{\"alarm_state\":9}"), &mut n);
    assert_eq!(node.resource().indicator().current(), Colour::RED);
}

// ── Registration ─────────────────────────────────────────────

#[test]
fn node_registers_its_resource() {
    let port = MockPort::new();
    let discovery = DiscoveryClient::new(ep(REGISTRY), "fd00::", Duration::from_millis(1));

    assert!(block_on(furnace().register(&port, &discovery)));
    let sent = port.sent_to("register");
    assert_eq!(sent[0].payload, "{\"id\":\"nodeFurnace\",\"resources\":[\"/res_furnace\"]}");

    port.kill(ep(REGISTRY));
    assert!(!block_on(alarm().register(&port, &discovery)));
    assert_eq!(port.sent.borrow().len(), 2, "a failed registration is not retried");
}
