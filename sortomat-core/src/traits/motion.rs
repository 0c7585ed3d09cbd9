//! Catcher and conveyor motion

use core::fmt::Debug;

use crate::color::ColorId;

/// Stepper-driven catcher and conveyor
///
/// Commands start a move and return once the controller accepted it; the
/// idle predicates tell when the move has finished.
pub trait Motion {
    type Error: Debug;

    /// Drive the catcher to its reference mark and zero its position
    ///
    /// Blocks until the reference mark has been found.
    fn home_catcher(&mut self) -> Result<(), Self::Error>;

    /// Drive the conveyor to its reference mark and zero its position
    fn home_conveyor(&mut self) -> Result<(), Self::Error>;

    /// Turn the catcher to the bin of `color`
    fn move_catcher(&mut self, color: ColorId) -> Result<(), Self::Error>;

    /// Move the conveyor by `half_slots` half-slot steps (negative = back)
    fn advance_conveyor(&mut self, half_slots: i8) -> Result<(), Self::Error>;

    /// Catcher motor has stopped
    ///
    /// Takes `&mut self` because the status lives on the motor controller.
    fn is_catcher_idle(&mut self) -> bool;

    /// Conveyor motor has stopped
    fn is_conveyor_idle(&mut self) -> bool;
}
