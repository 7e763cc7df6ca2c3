//! Foundation utilities: math aliases, timing, logging

pub mod logging;
pub mod math;
pub mod time;
