//! ADJD-S311 digital colour sensor
//!
//! Four photodiode channels (red, green, blue, clear) with programmable
//! capacitor gain and integration time per channel. A conversion is
//! started by writing a request bit into CTRL; the chip clears the bit
//! when the result registers are valid.

use sortomat_core::color::Rgbw;
use sortomat_hal::RegisterBus;

/// ADJD-S311 register addresses
pub mod reg {
    /// Conversion requests
    pub const CTRL: u8 = 0x00;
    /// Offset trim and sleep
    pub const CONFIG: u8 = 0x01;
    /// First gain register (capacitors, then integration times)
    pub const PARAM: u8 = 0x06;
    /// First data register (red low byte)
    pub const DATA: u8 = 0x40;
    /// Dark offset of the clear channel (signed)
    pub const OFFSET_CLEAR: u8 = 0x4B;
}

/// CTRL request bits
pub mod ctrl {
    /// Get sensor reading
    pub const GSSR: u8 = 0x01;
    /// Get offset reading
    pub const GOFS: u8 = 0x02;
}

/// Gain registers: capacitor count and integration slots per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Adjd311Params {
    /// Red, green, blue, clear (0-15)
    pub caps: [u8; 4],
    /// Red, green, blue, clear (0-4095)
    pub integration: [u16; 4],
}

impl Adjd311Params {
    /// Same capacitors and integration time on every channel
    pub const fn uniform(cap: u8, integration: u16) -> Self {
        Self {
            caps: [cap; 4],
            integration: [integration; 4],
        }
    }

    /// Register image starting at [`reg::PARAM`]
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..4].copy_from_slice(&self.caps);
        for (chunk, slots) in out[4..].chunks_exact_mut(2).zip(self.integration) {
            chunk.copy_from_slice(&slots.to_le_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Adjd311 {
    address: u8,
}

impl Adjd311 {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn set_params<B: RegisterBus>(&self, bus: &mut B, params: &Adjd311Params) -> Result<(), B::Error> {
        let mut frame = [0u8; 13];
        frame[0] = reg::PARAM;
        frame[1..].copy_from_slice(&params.to_bytes());
        bus.write(self.address, &frame)
    }

    pub fn set_config<B: RegisterBus>(&self, bus: &mut B, config: u8) -> Result<(), B::Error> {
        bus.write_register(self.address, reg::CONFIG, config)
    }

    /// Start a colour conversion and read the result
    pub fn read_color<B: RegisterBus>(&self, bus: &mut B) -> Result<Rgbw, B::Error> {
        self.request(bus, ctrl::GSSR)?;
        bus.write(self.address, &[reg::DATA])?;
        let mut raw = [0u8; 8];
        bus.read(self.address, &mut raw)?;
        let word = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        Ok(Rgbw::new(word(0), word(2), word(4), word(6)))
    }

    /// Start an offset conversion and read the clear channel dark offset
    pub fn read_clear_offset<B: RegisterBus>(&self, bus: &mut B) -> Result<i8, B::Error> {
        self.request(bus, ctrl::GOFS)?;
        let raw = bus.read_register(self.address, reg::OFFSET_CLEAR)?;
        Ok(raw as i8)
    }

    /// Write a CTRL request and spin until the chip has cleared it
    fn request<B: RegisterBus>(&self, bus: &mut B, bits: u8) -> Result<(), B::Error> {
        bus.write_register(self.address, reg::CTRL, bits)?;
        while bus.read_register(self.address, reg::CTRL)? != 0 {}
        Ok(())
    }
}
