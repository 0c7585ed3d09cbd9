//! Catcher and conveyor motion

pub mod controller;
pub mod expander;

pub use controller::{MotionConfig, MotionController};
pub use expander::{Barrier, Ejector, IoExpander};
