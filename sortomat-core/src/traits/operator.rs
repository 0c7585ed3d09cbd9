//! Operator interaction and calibration persistence

use core::fmt::Debug;

use crate::color::{ColorId, ColorTable};

/// Operator answering the learning prompt
pub trait Operator {
    /// Show the `proposed` classification and wait for the real colour
    ///
    /// Blocks until the operator answers.
    fn confirm_color(&mut self, proposed: ColorId) -> ColorId;
}

/// Non-volatile home of the reference colour table
pub trait CalibrationStore {
    type Error: Debug;

    fn store(&mut self, colors: &ColorTable) -> Result<(), Self::Error>;
}
