//! Stepper controller implementations

pub mod tmc222;

pub use tmc222::{Tmc222, Tmc222Params, Tmc222Status};
