//! TLC59116 16-channel constant-current LED driver
//!
//! Every channel has its own 8-bit PWM; a group PWM register dims all
//! channels configured for group control at once, which is used to
//! switch the sensor illumination on and off without losing the
//! per-channel calibration.

use heapless::Vec;
use sortomat_hal::RegisterBus;

/// TLC59116 register addresses
pub mod reg {
    pub const MODE1: u8 = 0x00;
    /// First per-channel brightness register
    pub const PWM0: u8 = 0x02;
    /// Group dimming
    pub const GRPPWM: u8 = 0x12;
    /// First output state register
    pub const LEDOUT0: u8 = 0x14;
}

/// Control register flags
pub mod flag {
    /// Auto-increment over all registers
    pub const AUTO_INCREMENT: u8 = 0x80;
    /// Auto-increment over the brightness registers only
    pub const AUTO_INCREMENT_PWM: u8 = 0xA0;
}

/// LED channel wiring on the sensor head
pub mod channel {
    pub const BLUE: u8 = 0;
    pub const GREEN: u8 = 2;
    pub const RED: u8 = 4;
}

const CHANNELS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tlc59116 {
    address: u8,
}

impl Tlc59116 {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    /// Normal mode, all-call off; channels 0-5 under individual and group
    /// dimming, channels 6-8 individual only
    pub fn init<B: RegisterBus>(&self, bus: &mut B) -> Result<(), B::Error> {
        bus.write(self.address, &[reg::MODE1 | flag::AUTO_INCREMENT, 0x80])?;
        bus.write(
            self.address,
            &[reg::LEDOUT0 | flag::AUTO_INCREMENT, 0xFF, 0xAF, 0x02],
        )
    }

    pub fn set_group_pwm<B: RegisterBus>(&self, bus: &mut B, duty: u8) -> Result<(), B::Error> {
        bus.write_register(self.address, reg::GRPPWM, duty)
    }

    pub fn set_channel<B: RegisterBus>(&self, bus: &mut B, channel: u8, duty: u8) -> Result<(), B::Error> {
        bus.write_register(self.address, reg::PWM0 + (channel & 0x0F), duty)
    }

    /// Write consecutive channel brightnesses starting at `first`
    ///
    /// Channels past the last one are dropped.
    pub fn set_block<B: RegisterBus>(&self, bus: &mut B, first: u8, duties: &[u8]) -> Result<(), B::Error> {
        let first = first & 0x0F;
        let count = duties.len().min(CHANNELS - first as usize);
        let mut frame: Vec<u8, { CHANNELS + 1 }> = Vec::new();
        // Capacity covers the register byte plus every channel
        let _ = frame.push(flag::AUTO_INCREMENT_PWM | (reg::PWM0 + first));
        let _ = frame.extend_from_slice(&duties[..count]);
        bus.write(self.address, &frame)
    }
}
