//! Edge control core: samples, fusion, thresholds and the control policy.

pub mod fusion;
pub mod policy;
pub mod sample;
pub mod thresholds;
