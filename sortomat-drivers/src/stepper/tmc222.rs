//! TMC222 stepper controller (two-wire mode)
//!
//! The TMC222 is a micro-stepping motor controller with an on-chip
//! position counter and ramp generator. The host only sends target
//! positions; the chip ramps the motor there on its own.
//!
//! # Command protocol
//!
//! Every command is a single write starting with a command byte:
//! - Commands with arguments put two `0xFF` filler bytes after the
//!   command byte, followed by the arguments.
//! - Status commands are a one-byte write followed by a separate read.
//!   The first byte read back is the chip's own address.
//!
//! Positions are signed 16-bit step counts sent big-endian.

use sortomat_hal::RegisterBus;

/// TMC222 command bytes
pub mod cmd {
    /// Read parameters, error flags and motion state
    pub const GET_FULL_STATUS1: u8 = 0x81;
    /// Zero actual and target position without moving
    pub const RESET_POSITION: u8 = 0x86;
    /// Program currents, velocities and acceleration
    pub const SET_MOTOR_PARAMETERS: u8 = 0x89;
    /// Move to an absolute target position
    pub const SET_POSITION: u8 = 0x8B;
    /// Decelerate to standstill
    pub const SOFT_STOP: u8 = 0x8F;
}

const FILLER: [u8; 2] = [0xFF, 0xFF];

/// Motor parameters for `SetMotorParameters`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tmc222Params {
    /// Hold current (0-15)
    pub i_hold: u8,
    /// Run current (0-15)
    pub i_run: u8,
    /// Minimum velocity (0-15)
    pub v_min: u8,
    /// Maximum velocity (0-15)
    pub v_max: u8,
    /// Acceleration (0-15)
    pub acc: u8,
    /// Invert direction
    pub shaft: bool,
    /// Secure position (11 bit)
    pub secure_position: u16,
    /// Step mode (0-3, 3 = 1/16 microstep)
    pub step_mode: u8,
    /// Constant velocity without ramps
    pub acc_shape: bool,
}

impl Default for Tmc222Params {
    fn default() -> Self {
        Self::CATCHER
    }
}

impl Tmc222Params {
    /// Catcher axis
    pub const CATCHER: Self = Self {
        i_hold: 8,
        i_run: 15,
        v_min: 2,
        v_max: 8,
        acc: 2,
        shaft: false,
        secure_position: 0x400,
        step_mode: 3,
        acc_shape: false,
    };

    /// Conveyor axis (one velocity step slower)
    pub const CONVEYOR: Self = Self {
        v_max: 7,
        ..Self::CATCHER
    };

    /// Reference search: no ramps, reduced run current
    pub const fn homing(self) -> Self {
        Self {
            acc_shape: true,
            i_run: 10,
            ..self
        }
    }

    /// Argument bytes of `SetMotorParameters`
    pub fn to_bytes(&self) -> [u8; 5] {
        let sec_hi = ((self.secure_position >> 8) & 0x07) as u8;
        let sec_lo = (self.secure_position & 0xFF) as u8;
        [
            (self.i_hold & 0x0F) | (self.i_run & 0x0F) << 4,
            (self.v_min & 0x0F) | (self.v_max & 0x0F) << 4,
            (self.acc & 0x0F) | (self.shaft as u8) << 4 | sec_hi << 5,
            sec_lo,
            (self.step_mode & 0x03) << 2 | (self.acc_shape as u8) << 4,
        ]
    }
}

/// Parsed `GetFullStatus1` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tmc222Status {
    pub i_hold: u8,
    pub i_run: u8,
    pub v_min: u8,
    pub v_max: u8,
    pub acc: u8,
    pub shaft: bool,
    pub step_mode: u8,
    pub acc_shape: bool,
    /// Temperature range (0-3)
    pub t_info: u8,
    /// Thermal warning
    pub tw: bool,
    /// Thermal shutdown
    pub tsd: bool,
    /// Battery under-voltage
    pub uv2: bool,
    /// Electrical defect
    pub el_def: bool,
    pub step_loss: bool,
    pub vdd_reset: bool,
    /// Charge pump failure
    pub cp_fail: bool,
    pub ovc2: bool,
    pub ovc1: bool,
    /// External switch
    pub esw: bool,
    /// Ramp phase; zero at standstill
    pub motion: u8,
}

impl Tmc222Status {
    /// Parse the 7 bytes read after `GetFullStatus1` (address byte first)
    pub fn from_bytes(raw: &[u8; 7]) -> Self {
        let bit = |byte: u8, n: u8| byte & (1 << n) != 0;
        Self {
            i_hold: raw[1] & 0x0F,
            i_run: raw[1] >> 4,
            v_min: raw[2] & 0x0F,
            v_max: raw[2] >> 4,
            acc: raw[3] & 0x0F,
            shaft: bit(raw[3], 4),
            step_mode: (raw[3] >> 5) & 0x03,
            acc_shape: bit(raw[3], 7),
            t_info: raw[4] & 0x03,
            tw: bit(raw[4], 2),
            tsd: bit(raw[4], 3),
            uv2: bit(raw[4], 4),
            el_def: bit(raw[4], 5),
            step_loss: bit(raw[4], 6),
            vdd_reset: bit(raw[4], 7),
            cp_fail: bit(raw[5], 0),
            ovc2: bit(raw[5], 2),
            ovc1: bit(raw[5], 3),
            esw: bit(raw[5], 4),
            motion: raw[5] >> 5,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.motion != 0
    }

    /// Any latched error flag
    pub fn has_fault(&self) -> bool {
        self.tsd || self.uv2 || self.el_def || self.step_loss || self.cp_fail
    }
}

/// One TMC222 on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tmc222 {
    address: u8,
}

impl Tmc222 {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Read status; also clears latched error flags on the chip
    pub fn get_full_status1<B: RegisterBus>(&self, bus: &mut B) -> Result<Tmc222Status, B::Error> {
        bus.write(self.address, &[cmd::GET_FULL_STATUS1])?;
        let mut raw = [0u8; 7];
        bus.read(self.address, &mut raw)?;
        Ok(Tmc222Status::from_bytes(&raw))
    }

    pub fn set_motor_parameters<B: RegisterBus>(
        &self,
        bus: &mut B,
        params: &Tmc222Params,
    ) -> Result<(), B::Error> {
        let args = params.to_bytes();
        let mut frame = [0u8; 8];
        frame[0] = cmd::SET_MOTOR_PARAMETERS;
        frame[1..3].copy_from_slice(&FILLER);
        frame[3..].copy_from_slice(&args);
        bus.write(self.address, &frame)
    }

    pub fn set_position<B: RegisterBus>(&self, bus: &mut B, position: i16) -> Result<(), B::Error> {
        let [hi, lo] = position.to_be_bytes();
        bus.write(self.address, &[cmd::SET_POSITION, FILLER[0], FILLER[1], hi, lo])
    }

    pub fn reset_position<B: RegisterBus>(&self, bus: &mut B) -> Result<(), B::Error> {
        bus.write(self.address, &[cmd::RESET_POSITION])
    }

    pub fn soft_stop<B: RegisterBus>(&self, bus: &mut B) -> Result<(), B::Error> {
        bus.write(self.address, &[cmd::SOFT_STOP])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, Op};

    #[test]
    fn test_catcher_parameter_bytes() {
        // IHold 8 | IRun 15, VMin 2 | VMax 8, Acc 2 | SecPosHi 4, SecPosLo 0,
        // StepMode 3
        assert_eq!(
            Tmc222Params::CATCHER.to_bytes(),
            [0xF8, 0x82, 0x82, 0x00, 0x0C]
        );
        assert_eq!(Tmc222Params::CONVEYOR.to_bytes()[1], 0x72);
    }

    #[test]
    fn test_homing_parameters() {
        let homing = Tmc222Params::CATCHER.homing();
        assert_eq!(homing.to_bytes()[0], 0xA8);
        assert_eq!(homing.to_bytes()[4], 0x1C);
        assert_eq!(homing.v_max, Tmc222Params::CATCHER.v_max);
    }

    #[test]
    fn test_status_parsing() {
        let raw = [0x61, 0xF8, 0x82, 0x62, 0x04, 0x61, 0xFF];
        let status = Tmc222Status::from_bytes(&raw);
        assert_eq!(status.i_hold, 8);
        assert_eq!(status.i_run, 15);
        assert_eq!(status.v_max, 8);
        assert_eq!(status.step_mode, 3);
        assert!(status.tw);
        assert!(status.cp_fail);
        assert_eq!(status.motion, 3);
        assert!(status.is_moving());
        assert!(status.has_fault());
    }

    #[test]
    fn test_set_position_frame() {
        let mut bus = MockBus::new();
        let motor = Tmc222::new(0x61);
        motor.set_position(&mut bus, -1067).unwrap();
        // -1067 = 0xFBD5
        assert_eq!(
            bus.writes_to(0x61),
            vec![vec![0x8B, 0xFF, 0xFF, 0xFB, 0xD5]]
        );
    }

    #[test]
    fn test_set_motor_parameters_frame() {
        let mut bus = MockBus::new();
        Tmc222::new(0x60)
            .set_motor_parameters(&mut bus, &Tmc222Params::CONVEYOR)
            .unwrap();
        assert_eq!(
            bus.writes_to(0x60),
            vec![vec![0x89, 0xFF, 0xFF, 0xF8, 0x72, 0x82, 0x00, 0x0C]]
        );
    }

    #[test]
    fn test_status_is_write_then_read() {
        let mut bus = MockBus::new();
        bus.reply(0x60, &[0x60, 0, 0, 0, 0, 0x00, 0]);
        let status = Tmc222::new(0x60).get_full_status1(&mut bus).unwrap();
        assert!(!status.is_moving());
        assert_eq!(
            bus.ops(),
            vec![Op::Write(0x60, vec![0x81]), Op::Read(0x60, 7)]
        );
    }
}
