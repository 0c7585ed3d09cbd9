//! Eight-bit quasi-bidirectional I/O expander
//!
//! The expander has no direction register: a pin reads as input while
//! its output latch is high. Every write therefore has to keep the input
//! pins at 1, which is why outputs are updated read-modify-write with the
//! input mask forced high.

use sortomat_core::traits::SolenoidDriver;
use sortomat_hal::RegisterBus;

/// Pin assignment
pub mod pin {
    /// Catcher light barrier, high while off the reference mark
    pub const CATCHER_BARRIER: u8 = 0;
    /// Conveyor light barrier, high while off the reference mark
    pub const CONVEYOR_BARRIER: u8 = 1;
    /// Ejector solenoid, active high
    pub const SOLENOID: u8 = 4;
    /// Silo vibrator, active low
    pub const VIBRATOR: u8 = 5;
    /// Pins used as inputs; written back as 1
    pub const INPUT_MASK: u8 = 0x07;
}

/// Light barrier marking an axis reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Barrier {
    Catcher,
    Conveyor,
}

impl Barrier {
    const fn pin(self) -> u8 {
        match self {
            Barrier::Catcher => pin::CATCHER_BARRIER,
            Barrier::Conveyor => pin::CONVEYOR_BARRIER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoExpander {
    address: u8,
}

impl IoExpander {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn read_pins<B: RegisterBus>(&self, bus: &mut B) -> Result<u8, B::Error> {
        let mut pins = [0u8];
        bus.read(self.address, &mut pins)?;
        Ok(pins[0])
    }

    /// True while the axis is away from its reference mark
    pub fn off_reference<B: RegisterBus>(&self, bus: &mut B, barrier: Barrier) -> Result<bool, B::Error> {
        Ok(self.read_pins(bus)? & (1 << barrier.pin()) != 0)
    }

    pub fn set_solenoid<B: RegisterBus>(&self, bus: &mut B, on: bool) -> Result<(), B::Error> {
        self.modify(bus, pin::SOLENOID, on)
    }

    fn modify<B: RegisterBus>(&self, bus: &mut B, bit: u8, high: bool) -> Result<(), B::Error> {
        let mut latch = self.read_pins(bus)? | pin::INPUT_MASK;
        if high {
            latch |= 1 << bit;
        } else {
            latch &= !(1 << bit);
        }
        bus.write(self.address, &[latch])
    }
}

/// Ejector solenoid behind the I/O expander
pub struct Ejector<B> {
    bus: B,
    expander: IoExpander,
}

impl<B: RegisterBus> Ejector<B> {
    pub fn new(bus: B, expander: IoExpander) -> Self {
        Self { bus, expander }
    }
}

impl<B: RegisterBus> SolenoidDriver for Ejector<B> {
    fn set_energized(&mut self, on: bool) {
        if let Err(_e) = self.expander.set_solenoid(&mut self.bus, on) {
            #[cfg(feature = "defmt")]
            defmt::warn!("solenoid write failed: {}", defmt::Debug2Format(&_e));
        }
    }
}
