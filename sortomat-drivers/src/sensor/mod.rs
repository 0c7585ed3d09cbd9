//! Colour sensor head: ADJD-S311 sensor and TLC59116 illumination

pub mod adjd_s311;
pub mod head;
pub mod tlc59116;

pub use adjd_s311::{Adjd311, Adjd311Params};
pub use head::{ColorSensorConfig, ColorSensorHead, LedPwm};
pub use tlc59116::Tlc59116;
