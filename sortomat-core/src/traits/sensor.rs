//! Colour sensor head

use core::fmt::Debug;

use crate::color::Rgbw;

/// Colour sensor with its illumination
pub trait ColorSensor {
    type Error: Debug;

    /// Tune sensor gain against the dark offset
    fn adapt_gain(&mut self) -> Result<(), Self::Error>;

    /// Tune LED brightness so no channel saturates on the empty slot
    fn adapt_leds(&mut self) -> Result<(), Self::Error>;

    /// Illuminate, settle and return an averaged reading
    fn measure_average(&mut self) -> Result<Rgbw, Self::Error>;
}
