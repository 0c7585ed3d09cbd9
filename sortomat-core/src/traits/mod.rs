//! Collaborator traits
//!
//! These traits define the interface between the sorter state machine
//! and the device drivers that move motors, read the colour sensor, talk
//! to the operator and persist calibration data.

pub mod motion;
pub mod operator;
pub mod sensor;

pub use motion::Motion;
pub use operator::{CalibrationStore, Operator};
pub use sensor::ColorSensor;

/// Output stage of the ejector solenoid
///
/// Called from the foreground only. Implementations that talk to a bus
/// report their own failures; the pulse timing carries on regardless.
pub trait SolenoidDriver {
    /// Energize or release the coil
    fn set_energized(&mut self, on: bool);
}
