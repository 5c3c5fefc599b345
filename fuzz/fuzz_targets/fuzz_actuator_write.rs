//! Fuzz target: `ActuatorResource::write`
//!
//! Splits the input on newlines and writes each piece to an alarm resource
//! with one observer, verifying:
//! - No panics under arbitrary payloads
//! - A 4.00 answer never changes the value or notifies
//! - Notifications match transitions one to one
//!
//! cargo fuzz run fuzz_actuator_write

#![no_main]

use std::net::Ipv6Addr;

use heatmesh::actuator::resource::ActuatorResource;
use heatmesh::actuator::{AlarmLevel, Indicator};
use heatmesh::app::ports::Notifier;
use heatmesh::coap::{Code, Endpoint};
use libfuzzer_sys::fuzz_target;

struct Count(usize);

impl Notifier for Count {
    fn notify(&mut self, _: &Endpoint, _: &str, _: &str) {
        self.0 += 1;
    }
}

struct Dark;

impl Indicator<AlarmLevel> for Dark {
    fn show(&mut self, _: AlarmLevel) {}
}

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut res = ActuatorResource::new(AlarmLevel::Safe, Dark);
    res.observe(Endpoint::new(Ipv6Addr::LOCALHOST));
    let mut pushes = Count(0);

    for line in text.split('\n') {
        let before = res.value();
        let sent = pushes.0;
        let resp = res.write(line, &mut pushes);
        match resp.code {
            Code::Changed => assert_eq!(pushes.0 - sent, usize::from(res.value() != before)),
            Code::BadRequest => {
                assert_eq!(res.value(), before);
                assert_eq!(pushes.0, sent);
            }
            other => panic!("unexpected status {other}"),
        }
    }
});
