//! Persisted configuration
//!
//! The only runtime-persisted data is the reference colour table; all other
//! board settings are compile-time defaults of the driver config structs.

pub mod calibration;

pub use calibration::{load_color_table, save_color_table, CalibrationError};
