//! Integration tests for the EdgeService → fusion → policy → mirrors pipeline.
//!
//! Requests enter through `serve` exactly as the runtime hands them over;
//! outcomes are read back from the follow-ups, the mirrors and the events.

use core::time::Duration;

use heatmesh::actuator::{ActuatorKind, AlarmLevel, FurnaceState};
use heatmesh::app::events::AppEvent;
use heatmesh::app::service::{EdgeService, FollowUp, RES_POWER, RES_ROOF, RES_THRESHOLD};
use heatmesh::coap::payload::encode_roof;
use heatmesh::coap::{Code, Request};
use heatmesh::control::policy::ControlPolicy;
use heatmesh::control::sample::RoofSample;
use heatmesh::control::thresholds::ThresholdConfig;
use heatmesh::dispatch::{DispatchPlan, DispatchReport};
use heatmesh::error::ExchangeError;

use super::mock_mesh::{
    ConstModel, EPOCH, FURNACE, FixedClock, RecordingIndicator, RecordingNotifier, RecordingSink, SENSOR, ep,
};

type Service = EdgeService<ConstModel, RecordingIndicator<bool>>;

/// Raw model output 2000 → next_power 4000, so `energy_diff = 4000 - next_solar`.
fn make_service() -> (Service, RecordingNotifier, RecordingSink) {
    let mut sink = RecordingSink::default();
    let mut s = EdgeService::with_parts(
        ThresholdConfig::default(),
        ControlPolicy::default(),
        ConstModel(2000.0),
        RecordingIndicator::default(),
    );
    s.start(&mut sink);
    (s, RecordingNotifier::default(), sink)
}

fn roof(next_solar: i32) -> Request {
    Request::put(
        RES_ROOF,
        encode_roof(&RoofSample {
            solar: 400,
            month: 3,
            hour: 11,
            temperature: 19,
            humidity: 55,
            next_solar,
        })
        .unwrap(),
    )
}

fn power(watts: i32) -> Request {
    Request::put(RES_POWER, format!("{{\"power\": {watts}}}"))
}

/// Roof then power: arm, then fire.
fn full_cycle(s: &mut Service, n: &mut RecordingNotifier, sink: &mut RecordingSink, next_solar: i32) -> DispatchPlan {
    let clock = FixedClock(EPOCH);
    let first = s.serve(&ep(SENSOR), &roof(next_solar), &clock, n, sink);
    assert_eq!(first.response.code, Code::Changed);
    assert!(matches!(first.follow_up, FollowUp::ArmTimeout(_)), "got {:?}", first.follow_up);

    let second = s.serve(&ep(SENSOR), &power(1800), &clock, n, sink);
    assert_eq!(second.response.code, Code::Changed);
    match second.follow_up {
        FollowUp::Dispatch(plan) => plan,
        other => panic!("expected dispatch, got {:?}", other),
    }
}

fn all_delivered(plan: &DispatchPlan) -> DispatchReport {
    DispatchReport {
        telemetry: Ok(()),
        prediction: Ok(()),
        alarm: plan.alarm.map(|_| Ok(())),
        furnace: plan.furnace.map(|_| Ok(())),
    }
}

fn last_diff(sink: &RecordingSink) -> i32 {
    sink.events
        .iter()
        .rev()
        .find_map(|e| match e {
            AppEvent::CycleCompleted(c) => Some(c.energy_diff),
            _ => None,
        })
        .expect("no cycle completed")
}

// ── Alarm bands at the default thresholds ────────────────────

#[test]
fn boundary_diff_stays_in_lower_band_and_above_off_sheds_load() {
    let (mut s, mut n, mut sink) = make_service();

    let plan = full_cycle(&mut s, &mut n, &mut sink, 3000);
    assert_eq!(last_diff(&sink), 1000);
    assert_eq!(s.alarm().value(), AlarmLevel::Safe);
    assert_eq!(plan.alarm, None, "already safe, nothing to send");
    assert_eq!(plan.furnace, Some(FurnaceState::On));
    s.complete_dispatch(&plan, &all_delivered(&plan), &mut sink);

    let plan = full_cycle(&mut s, &mut n, &mut sink, 999);
    assert_eq!(last_diff(&sink), 3001);
    assert_eq!(plan.alarm, Some(AlarmLevel::ShedLoad));
    assert_eq!(plan.furnace, Some(FurnaceState::Off));
}

#[test]
fn cut_band_starts_above_thirty_percent_margin() {
    let (mut s, mut n, mut sink) = make_service();

    let plan = full_cycle(&mut s, &mut n, &mut sink, 100);
    assert_eq!(last_diff(&sink), 3900);
    assert_eq!(plan.alarm, Some(AlarmLevel::ShedLoad));
    s.complete_dispatch(&plan, &all_delivered(&plan), &mut sink);

    let plan = full_cycle(&mut s, &mut n, &mut sink, 99);
    assert_eq!(plan.alarm, Some(AlarmLevel::CutRisk));
}

#[test]
fn prediction_carries_timestamp_and_solar() {
    let (mut s, mut n, mut sink) = make_service();
    let plan = full_cycle(&mut s, &mut n, &mut sink, 1234);
    assert_eq!(plan.prediction.timestamp, EPOCH);
    assert_eq!(plan.prediction.next_power, 4000);
    assert_eq!(plan.prediction.next_solar, 1234);
    assert!(!plan.prediction.missing);
    assert_eq!(plan.power.power, 1800);
    assert_eq!(plan.roof.month, 3);
    assert_eq!(s.last_prediction(), Some(plan.prediction));
}

// ── Missing-data path ────────────────────────────────────────

#[test]
fn timeout_fires_once_and_late_counterpart_does_not_refire() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);

    let served = s.serve(&ep(SENSOR), &roof(500), &clock, &mut n, &mut sink);
    let FollowUp::ArmTimeout(token) = served.follow_up else {
        panic!("expected arm, got {:?}", served.follow_up);
    };

    let plan = s.on_fusion_timeout(token, &clock, &mut sink).expect("timeout should fire");
    assert!(plan.prediction.missing);
    assert_eq!(plan.power.power, 1000, "boot default power is used");
    assert_eq!(s.cycles(), 1);

    // Power shows up just after the deadline: it starts a new wait, it
    // does not complete the roof sample that already fired.
    let late = s.serve(&ep(SENSOR), &power(2500), &clock, &mut n, &mut sink);
    assert!(matches!(late.follow_up, FollowUp::ArmTimeout(_)));
    assert_eq!(s.cycles(), 1);

    // The first deadline's token is spent.
    assert!(s.on_fusion_timeout(token, &clock, &mut sink).is_none());
    assert_eq!(sink.cycles(), 1);
}

#[test]
fn completeness_voids_pending_timeout() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);

    let served = s.serve(&ep(SENSOR), &power(900), &clock, &mut n, &mut sink);
    let FollowUp::ArmTimeout(token) = served.follow_up else {
        panic!("expected arm");
    };
    // Second power sample while waiting: no new arming.
    let again = s.serve(&ep(SENSOR), &power(950), &clock, &mut n, &mut sink);
    assert_eq!(again.follow_up, FollowUp::Nothing);

    let fired = s.serve(&ep(SENSOR), &roof(0), &clock, &mut n, &mut sink);
    let FollowUp::Dispatch(plan) = fired.follow_up else {
        panic!("expected dispatch");
    };
    assert_eq!(plan.power.power, 950);
    assert!(s.on_fusion_timeout(token, &clock, &mut sink).is_none());
    assert_eq!(s.cycles(), 1);
}

// ── Mirrors: remote sync and dispatch clearing ───────────────

#[test]
fn pushed_state_is_adopted_without_echo() {
    let (mut s, mut n, mut sink) = make_service();

    s.on_notification(ActuatorKind::Alarm, "1", &mut sink);
    s.on_notification(ActuatorKind::Furnace, "{\"furnace_state\":1}", &mut sink);
    assert_eq!(s.alarm().value(), AlarmLevel::Moderate);
    assert_eq!(s.furnace().value(), FurnaceState::On);
    assert!(!s.alarm().is_changed());
    assert!(!s.furnace().is_changed());

    // diff 2000 is in the moderate band and the hysteresis dead zone.
    let plan = full_cycle(&mut s, &mut n, &mut sink, 2000);
    assert_eq!(plan.alarm, None);
    assert_eq!(plan.furnace, None);
}

#[test]
fn dispatch_attempt_clears_flags_even_on_failure() {
    let (mut s, mut n, mut sink) = make_service();
    let plan = full_cycle(&mut s, &mut n, &mut sink, 0);
    assert!(s.alarm().is_changed());
    assert_eq!(plan.furnace, None, "already off");

    let report = DispatchReport {
        telemetry: Err(ExchangeError::Timeout),
        prediction: Ok(()),
        alarm: Some(Err(ExchangeError::Timeout)),
        furnace: None,
    };
    s.complete_dispatch(&plan, &report, &mut sink);

    assert!(!s.alarm().is_changed());
    assert!(!s.furnace().is_changed());
    assert_eq!(s.alarm().value(), AlarmLevel::CutRisk);
    assert!(sink.events.contains(&AppEvent::ActuationSent {
        kind: ActuatorKind::Alarm,
        value: 3,
        result: Err(ExchangeError::Timeout),
    }));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PublishFailed { .. })), 1);
}

#[test]
fn malformed_push_leaves_mirror_alone() {
    let (mut s, _, mut sink) = make_service();
    s.on_notification(ActuatorKind::Furnace, "{\"furnace_state\":7}", &mut sink);
    s.on_notification(ActuatorKind::Alarm, "", &mut sink);
    assert_eq!(s.furnace().value(), FurnaceState::Off);
    assert_eq!(s.alarm().value(), AlarmLevel::Safe);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::NotificationDropped { .. })), 2);
}

// ── Thresholds and control mode ──────────────────────────────

#[test]
fn manual_mode_freezes_furnace_but_not_alarm() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);

    let put = Request::put(RES_THRESHOLD, "{\"auto_furnace_ctrl\": 0}");
    assert_eq!(s.serve(&ep(SENSOR), &put, &clock, &mut n, &mut sink).response.code, Code::Changed);
    assert_eq!(s.lamp().shown, vec![true, false]);

    let plan = full_cycle(&mut s, &mut n, &mut sink, 3500);
    assert_eq!(plan.furnace, None, "diff 500 would switch on in auto mode");
    assert_eq!(plan.alarm, None);

    let plan = full_cycle(&mut s, &mut n, &mut sink, 0);
    assert_eq!(plan.furnace, None);
    assert_eq!(plan.alarm, Some(AlarmLevel::CutRisk));
}

#[test]
fn threshold_observers_hear_every_accepted_change() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);
    let other = ep(FURNACE);

    for who in [ep(SENSOR), other, ep(SENSOR)] {
        let get = s.serve(&who, &Request::get(RES_THRESHOLD).observe(), &clock, &mut n, &mut sink);
        assert_eq!(get.response.payload, "{\"auto_furnace_ctrl\":1,\"on_threshold\":1000,\"off_threshold\":3000}");
    }
    assert_eq!(s.threshold_observers().len(), 2);

    let put = Request::put(RES_THRESHOLD, "{\"threshold_on\": 800, \"threshold_off\": 2500}");
    assert_eq!(s.serve(&ep(SENSOR), &put, &clock, &mut n, &mut sink).response.code, Code::Changed);
    assert_eq!(n.pushes.len(), 2);
    assert!(n.pushes.iter().all(|p| p.resource == RES_THRESHOLD
        && p.payload == "{\"auto_furnace_ctrl\":1,\"on_threshold\":800,\"off_threshold\":2500}"));

    // Same values again: accepted, nothing to tell.
    assert_eq!(s.serve(&ep(SENSOR), &put, &clock, &mut n, &mut sink).response.code, Code::Changed);
    assert_eq!(n.pushes.len(), 2);

    // Edge button: long press turns auto control off.
    s.on_button_released(Duration::from_secs(5), &mut n, &mut sink);
    assert_eq!(n.pushes.len(), 4);
    assert_eq!(s.lamp().shown.last(), Some(&false));
}

#[test]
fn invalid_threshold_puts_change_nothing() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);

    for body in [
        "{\"threshold_off\": 500}",
        "{\"threshold_on\": 3000}",
        "{\"auto_furnace_ctrl\": 2}",
        "{\"unrelated\": 1}",
        "",
        "garbage",
    ] {
        let served = s.serve(&ep(SENSOR), &Request::put(RES_THRESHOLD, body), &clock, &mut n, &mut sink);
        assert_eq!(served.response.code, Code::BadRequest, "body {:?}", body);
    }
    assert_eq!(s.thresholds(), ThresholdConfig::default());
    assert!(n.pushes.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ThresholdsUpdated(_))), 0);
}

#[test]
fn sensor_resources_answer_last_sample() {
    let (mut s, mut n, mut sink) = make_service();
    let clock = FixedClock(EPOCH);
    s.serve(&ep(SENSOR), &power(4321), &clock, &mut n, &mut sink);

    let get = s.serve(&ep(SENSOR), &Request::get(RES_POWER), &clock, &mut n, &mut sink);
    assert_eq!(get.response.code, Code::Content);
    assert_eq!(get.response.payload, "{\"power\":4321}");
    assert_eq!(get.follow_up, FollowUp::Nothing);
}
