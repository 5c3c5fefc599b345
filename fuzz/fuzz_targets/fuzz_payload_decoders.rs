//! Fuzz target: inbound payload decoders
//!
//! Feeds arbitrary text to every decoder at the payload boundary and checks
//! that accepted values are always inside their domains.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A decoded roof sample has month 1–12 and hour 0–23
//! - A decoded threshold update is never empty
//! - A decoded lookup address always carries the mesh prefix
//!
//! cargo fuzz run fuzz_payload_decoders

#![no_main]

use heatmesh::actuator::{AlarmLevel, FurnaceState};
use heatmesh::coap::payload::{
    decode_command, decode_lookup, decode_power, decode_roof, decode_state, decode_threshold_update,
    decode_timestamp,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(roof) = decode_roof(text) {
        assert!((1..=12).contains(&roof.month));
        assert!((0..=23).contains(&roof.hour));
    }
    let _ = decode_power(text);

    if let Ok(update) = decode_threshold_update(text) {
        assert!(!update.is_empty());
    }

    let _ = decode_command::<FurnaceState>(text);
    let _ = decode_command::<AlarmLevel>(text);
    let _ = decode_state::<FurnaceState>(text);
    let _ = decode_state::<AlarmLevel>(text);
    let _ = decode_timestamp(text);

    if let Some(endpoint) = decode_lookup(text, "fd00::") {
        assert_eq!(endpoint.addr.segments()[0], 0xfd00);
    }
});
