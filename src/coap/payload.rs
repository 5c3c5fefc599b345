//! Textual payload codec.
//!
//! Every payload in the mesh is a compact JSON-like key/value object.
//! Decoding rules, applied uniformly:
//!
//! - surrounding whitespace and unknown fields are ignored;
//! - a missing required field rejects the whole payload (no partial apply);
//! - out-of-domain values are rejected with [`PayloadError::OutOfRange`].
//!
//! Decoders return fresh values; callers only commit them on `Ok`, so an
//! invalid payload never mutates prior state.

use serde::Serialize;
use serde_json::Value;

use crate::actuator::ActuatorValue;
use crate::coap::Endpoint;
use crate::control::policy::PredictionResult;
use crate::control::sample::{PowerSample, RoofSample};
use crate::control::thresholds::{ThresholdConfig, ThresholdUpdate};
use crate::error::PayloadError;

/// Largest payload any served resource accepts.
pub const MAX_PAYLOAD_LEN: usize = 128;

fn check_len(text: &str) -> Result<&str, PayloadError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PayloadError::Empty);
    }
    if text.len() >= MAX_PAYLOAD_LEN {
        return Err(PayloadError::TooLarge);
    }
    Ok(text)
}

fn to_text<T: Serialize>(body: &T) -> Result<String, PayloadError> {
    serde_json::to_string(body).map_err(|_| PayloadError::Unencodable)
}

fn int_field(obj: &serde_json::Map<String, Value>, key: &'static str) -> Result<Option<i32>, PayloadError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .ok_or(PayloadError::Malformed)
            .and_then(|n| i32::try_from(n).map_err(|_| PayloadError::OutOfRange(key)))
            .map(Some),
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor samples
// ───────────────────────────────────────────────────────────────

pub fn decode_roof(text: &str) -> Result<RoofSample, PayloadError> {
    let sample: RoofSample = serde_json::from_str(check_len(text)?)?;
    if !(1..=12).contains(&sample.month) {
        return Err(PayloadError::OutOfRange("mese"));
    }
    if !(0..=23).contains(&sample.hour) {
        return Err(PayloadError::OutOfRange("ora"));
    }
    Ok(sample)
}

pub fn decode_power(text: &str) -> Result<PowerSample, PayloadError> {
    Ok(serde_json::from_str(check_len(text)?)?)
}

pub fn encode_roof(sample: &RoofSample) -> Result<String, PayloadError> {
    to_text(sample)
}

pub fn encode_power(sample: &PowerSample) -> Result<String, PayloadError> {
    to_text(sample)
}

// ───────────────────────────────────────────────────────────────
// Thresholds
// ───────────────────────────────────────────────────────────────

/// Decode a threshold PUT. Any subset of `threshold_on`, `threshold_off`
/// and `auto_furnace_ctrl` may be present; at least one must be.
pub fn decode_threshold_update(text: &str) -> Result<ThresholdUpdate, PayloadError> {
    let value: Value = serde_json::from_str(check_len(text)?)?;
    let obj = value.as_object().ok_or(PayloadError::Malformed)?;

    let update = ThresholdUpdate {
        threshold_on: int_field(obj, "threshold_on")?,
        threshold_off: int_field(obj, "threshold_off")?,
        auto_furnace_ctrl: match int_field(obj, "auto_furnace_ctrl")? {
            None => None,
            Some(0) => Some(false),
            Some(1) => Some(true),
            Some(_) => return Err(PayloadError::OutOfRange("auto_furnace_ctrl")),
        },
    };

    if update.is_empty() {
        return Err(PayloadError::UnknownField);
    }
    Ok(update)
}

#[derive(Serialize)]
struct ThresholdBody {
    auto_furnace_ctrl: u8,
    on_threshold: i32,
    off_threshold: i32,
}

pub fn encode_thresholds(config: &ThresholdConfig) -> Result<String, PayloadError> {
    to_text(&ThresholdBody {
        auto_furnace_ctrl: u8::from(config.auto_furnace_ctrl),
        on_threshold: config.threshold_on,
        off_threshold: config.threshold_off,
    })
}

// ───────────────────────────────────────────────────────────────
// Actuators
// ───────────────────────────────────────────────────────────────

/// Decode an actuation command, e.g. `{"alarm_state": 2}`.
pub fn decode_command<V: ActuatorValue>(text: &str) -> Result<V, PayloadError> {
    let value: Value = serde_json::from_str(check_len(text)?)?;
    let field = V::KIND.field();
    let raw = value
        .get(field)
        .ok_or(PayloadError::Malformed)?
        .as_i64()
        .ok_or(PayloadError::Malformed)?;
    V::from_raw(raw).ok_or(PayloadError::OutOfRange(field))
}

pub fn encode_command<V: ActuatorValue>(value: V) -> String {
    format!("{{\"{}\":{}}}", V::KIND.field(), value.raw())
}

/// GET / notification encoding. The alarm node answers with a bare integer,
/// the furnace node with a command-shaped object.
pub fn encode_state<V: ActuatorValue>(value: V) -> String {
    match V::KIND {
        crate::actuator::ActuatorKind::Alarm => value.raw().to_string(),
        crate::actuator::ActuatorKind::Furnace => encode_command(value),
    }
}

/// Decode a pushed actuator state. Accepts both the bare integer and the
/// object form so either node's encoding is understood.
pub fn decode_state<V: ActuatorValue>(text: &str) -> Result<V, PayloadError> {
    let trimmed = check_len(text)?;
    if let Ok(raw) = trimmed.parse::<i64>() {
        return V::from_raw(raw).ok_or(PayloadError::OutOfRange(V::KIND.field()));
    }
    decode_command(trimmed)
}

// ───────────────────────────────────────────────────────────────
// Registry exchange
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RegisterBody<'a> {
    id: &'a str,
    resources: Vec<String>,
}

/// `{"id":"<node>","resources":["/res_a","/res_b"]}`
pub fn encode_register(node_id: &str, resources: &[&str]) -> Result<String, PayloadError> {
    let body = RegisterBody {
        id: node_id,
        resources: resources
            .iter()
            .map(|r| format!("/{}", r.trim_start_matches('/')))
            .collect(),
    };
    to_text(&body)
}

/// Lookup query string for a resource name.
pub fn lookup_query(resource: &str) -> String {
    format!("res=/{}", resource.trim_start_matches('/'))
}

/// Extract the address from a lookup answer (`{"ip" : "fd00::…"}`).
/// Anything not carrying a prefixed address is `None` ("not found yet").
pub fn decode_lookup(text: &str, prefix: &str) -> Option<Endpoint> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let ip = value.get("ip")?.as_str()?;
    Endpoint::parse_prefixed(ip, prefix)
}

/// Server epoch from `{"timestamp": "1718000000"}` (string or number).
pub fn decode_timestamp(text: &str) -> Option<u64> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    match value.get("timestamp")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Outbound telemetry
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TelemetryBody {
    ts: String,
    sol: i32,
    mese: i32,
    ora: i32,
    temp: i32,
    hum: i32,
    pow: i32,
}

/// Raw readings for the `data` peer.
pub fn encode_telemetry(timestamp: u64, roof: &RoofSample, power: &PowerSample) -> Result<String, PayloadError> {
    to_text(&TelemetryBody {
        ts: timestamp.to_string(),
        sol: roof.solar,
        mese: roof.month,
        ora: roof.hour,
        temp: roof.temperature,
        hum: roof.humidity,
        pow: power.power,
    })
}

#[derive(Serialize)]
struct PredictionBody {
    ts: String,
    #[serde(rename = "nPow")]
    next_power: i32,
    #[serde(rename = "nSol")]
    next_solar: i32,
    miss: u8,
}

/// Prediction record for the `prediction` peer.
pub fn encode_prediction(result: &PredictionResult) -> Result<String, PayloadError> {
    to_text(&PredictionBody {
        ts: result.timestamp.to_string(),
        next_power: result.next_power,
        next_solar: result.next_solar,
        miss: u8::from(result.missing),
    })
}
