//! Concrete implementations of the port traits and indicators.
//!
//! | Adapter    | Implements            | Connects to                    |
//! |------------|-----------------------|--------------------------------|
//! | `led`      | Indicator             | `embedded-hal` output pins     |
//! | `log_sink` | EventSink             | `log` facade                   |
//! | `sim_mesh` | CoapPort, Notifier    | in-process simulated mesh      |
//! | `time`     | ClockPort             | monotonic clock + server epoch |

pub mod led;
pub mod log_sink;
pub mod sim_mesh;
pub mod time;
