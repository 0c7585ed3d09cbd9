//! Motion controller for catcher and conveyor
//!
//! Both axes are TMC222-driven and share one revolution of 3200 steps.
//! Each has a light barrier on the I/O expander that marks its reference
//! position. The catcher carries one bin per colour class; the conveyor
//! moves in half-slot steps of 160.

use sortomat_core::color::ColorId;
use sortomat_core::traits::Motion;
use sortomat_hal::RegisterBus;

use super::expander::{Barrier, IoExpander};
use crate::stepper::{Tmc222, Tmc222Params, Tmc222Status};

/// Board wiring and mechanics
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionConfig {
    pub catcher_address: u8,
    pub conveyor_address: u8,
    pub expander_address: u8,
    pub catcher_params: Tmc222Params,
    pub conveyor_params: Tmc222Params,
    /// Catcher step position of each colour bin, indexed by colour id
    pub catcher_positions: [i16; ColorId::COUNT],
    /// Steps per full axis revolution
    pub steps_per_revolution: i16,
    /// Conveyor steps per half slot
    pub steps_per_half_slot: i16,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            catcher_address: 0x61,
            conveyor_address: 0x60,
            expander_address: 0x20,
            catcher_params: Tmc222Params::CATCHER,
            conveyor_params: Tmc222Params::CONVEYOR,
            catcher_positions: [0, 356, 711, 1067, 1422, 1778, 2133, 2489, 2844],
            steps_per_revolution: 3200,
            steps_per_half_slot: 160,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Catcher,
    Conveyor,
}

/// Catcher and conveyor on one bus
pub struct MotionController<B> {
    bus: B,
    config: MotionConfig,
    catcher: Tmc222,
    conveyor: Tmc222,
    expander: IoExpander,
    catcher_status: Tmc222Status,
    conveyor_status: Tmc222Status,
    catcher_bin: usize,
    catcher_steps: i16,
    conveyor_steps: i16,
}

impl<B: RegisterBus> MotionController<B> {
    pub fn new(bus: B, config: MotionConfig) -> Self {
        Self {
            bus,
            catcher: Tmc222::new(config.catcher_address),
            conveyor: Tmc222::new(config.conveyor_address),
            expander: IoExpander::new(config.expander_address),
            config,
            catcher_status: Tmc222Status::default(),
            conveyor_status: Tmc222Status::default(),
            catcher_bin: 0,
            catcher_steps: 0,
            conveyor_steps: 0,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Last status read from the catcher controller
    pub fn catcher_status(&self) -> &Tmc222Status {
        &self.catcher_status
    }

    pub fn conveyor_status(&self) -> &Tmc222Status {
        &self.conveyor_status
    }

    /// Bin the catcher was last sent to
    pub fn catcher_bin(&self) -> usize {
        self.catcher_bin
    }

    fn driver(&self, axis: Axis) -> Tmc222 {
        match axis {
            Axis::Catcher => self.catcher,
            Axis::Conveyor => self.conveyor,
        }
    }

    fn params(&self, axis: Axis) -> Tmc222Params {
        match axis {
            Axis::Catcher => self.config.catcher_params,
            Axis::Conveyor => self.config.conveyor_params,
        }
    }

    /// Read the axis status; a failed read keeps the last known one
    fn refresh(&mut self, axis: Axis) -> &Tmc222Status {
        let result = self.driver(axis).get_full_status1(&mut self.bus);
        let slot = match axis {
            Axis::Catcher => &mut self.catcher_status,
            Axis::Conveyor => &mut self.conveyor_status,
        };
        match result {
            Ok(status) => *slot = status,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("{} status read failed: {}", axis_name(axis), defmt::Debug2Format(&_e));
            }
        }
        slot
    }

    fn is_idle(&mut self, axis: Axis) -> bool {
        !self.refresh(axis).is_moving()
    }

    /// Reference search: one slow turn until the barrier reports the mark
    fn home(&mut self, axis: Axis, barrier: Barrier) -> Result<(), B::Error> {
        let driver = self.driver(axis);
        let params = self.params(axis);

        self.refresh(axis);
        driver.set_motor_parameters(&mut self.bus, &params.homing())?;
        driver.reset_position(&mut self.bus)?;
        driver.set_position(&mut self.bus, self.config.steps_per_revolution)?;
        while self.expander.off_reference(&mut self.bus, barrier)? {}
        driver.soft_stop(&mut self.bus)?;
        while !self.is_idle(axis) {}

        match axis {
            Axis::Catcher => {
                self.catcher_bin = 0;
                self.catcher_steps = 0;
            }
            Axis::Conveyor => self.conveyor_steps = 0,
        }
        driver.reset_position(&mut self.bus)?;
        driver.set_motor_parameters(&mut self.bus, &params)?;

        #[cfg(feature = "defmt")]
        defmt::info!("{} homed", axis_name(axis));
        Ok(())
    }

    /// Step offset from the current bin to `bin` along the shorter way round
    fn catcher_offset(&self, bin: usize) -> i16 {
        let revolution = self.config.steps_per_revolution;
        let limit = revolution * 9 / 16;
        let positions = &self.config.catcher_positions;
        let offset = positions[bin] - positions[self.catcher_bin];
        if offset > limit {
            offset - revolution
        } else if offset < -limit {
            offset + revolution
        } else {
            offset
        }
    }
}

impl<B: RegisterBus> Motion for MotionController<B> {
    type Error = B::Error;

    fn home_catcher(&mut self) -> Result<(), B::Error> {
        self.home(Axis::Catcher, Barrier::Catcher)
    }

    fn home_conveyor(&mut self) -> Result<(), B::Error> {
        self.home(Axis::Conveyor, Barrier::Conveyor)
    }

    fn move_catcher(&mut self, color: ColorId) -> Result<(), B::Error> {
        let bin = color.index();
        if bin == self.catcher_bin {
            return Ok(());
        }
        let offset = self.catcher_offset(bin);
        self.catcher_steps = self.catcher_steps.wrapping_add(offset);
        self.catcher_bin = bin;
        self.catcher.set_position(&mut self.bus, self.catcher_steps)
    }

    /// Waits for the previous conveyor move to finish first
    fn advance_conveyor(&mut self, half_slots: i8) -> Result<(), B::Error> {
        while !self.is_idle(Axis::Conveyor) {}
        let steps = self
            .config
            .steps_per_half_slot
            .wrapping_mul(i16::from(half_slots));
        self.conveyor_steps = self.conveyor_steps.wrapping_add(steps);
        self.conveyor.set_position(&mut self.bus, self.conveyor_steps)
    }

    fn is_catcher_idle(&mut self) -> bool {
        self.is_idle(Axis::Catcher)
    }

    fn is_conveyor_idle(&mut self) -> bool {
        self.is_idle(Axis::Conveyor)
    }
}

#[cfg(feature = "defmt")]
fn axis_name(axis: Axis) -> &'static str {
    match axis {
        Axis::Catcher => "catcher",
        Axis::Conveyor => "conveyor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, Op};

    const CATCHER: u8 = 0x61;
    const CONVEYOR: u8 = 0x60;
    const EXPANDER: u8 = 0x20;

    fn status(motion: u8) -> [u8; 7] {
        [CATCHER, 0, 0, 0, 0, motion << 5, 0]
    }

    fn controller() -> (MotionController<MockBus>, MockBus) {
        let bus = MockBus::new();
        bus.fallback(CATCHER, &status(0));
        bus.fallback(CONVEYOR, &status(0));
        (MotionController::new(bus.clone(), MotionConfig::default()), bus)
    }

    fn set_positions(bus: &MockBus, address: u8) -> Vec<i16> {
        bus.writes_to(address)
            .into_iter()
            .filter(|frame| frame[0] == 0x8B)
            .map(|frame| i16::from_be_bytes([frame[3], frame[4]]))
            .collect()
    }

    #[test]
    fn test_catcher_takes_shorter_way() {
        let (mut motion, bus) = controller();

        motion.move_catcher(ColorId::Yellow).unwrap();
        motion.move_catcher(ColorId::Brown).unwrap();
        // 2844 - 1067 = 1777, within range
        motion.move_catcher(ColorId::Red).unwrap();
        // 356 - 2844 = -2488 -> +712
        motion.move_catcher(ColorId::Brown).unwrap();
        // 2844 - 356 = 2488 -> -712

        assert_eq!(set_positions(&bus, CATCHER), vec![1067, 2844, 3556, 2844]);
        assert_eq!(motion.catcher_bin(), ColorId::Brown.index());
    }

    #[test]
    fn test_catcher_already_there_sends_nothing() {
        let (mut motion, bus) = controller();
        motion.move_catcher(ColorId::Unknown).unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_conveyor_waits_then_moves() {
        let (mut motion, bus) = controller();
        bus.reply(CONVEYOR, &status(2));
        bus.reply(CONVEYOR, &status(1));

        motion.advance_conveyor(2).unwrap();
        motion.advance_conveyor(-1).unwrap();

        assert_eq!(set_positions(&bus, CONVEYOR), vec![320, 160]);
        let status_reads = bus
            .ops()
            .iter()
            .filter(|op| **op == Op::Write(CONVEYOR, vec![0x81]))
            .count();
        // two busy polls, one idle poll, then one idle poll for the second move
        assert_eq!(status_reads, 4);
    }

    #[test]
    fn test_homing_sequence() {
        let (mut motion, bus) = controller();
        motion.move_catcher(ColorId::Green).unwrap();
        bus.clear_ops();

        // Barrier: off reference twice, then on the mark
        bus.reply(EXPANDER, &[0b01]);
        bus.reply(EXPANDER, &[0b01]);
        bus.reply(EXPANDER, &[0b00]);
        // Initial status, then moving once after the stop
        bus.reply(CATCHER, &status(0));
        bus.reply(CATCHER, &status(4));

        motion.home_catcher().unwrap();

        let homing = Tmc222Params::CATCHER.homing().to_bytes();
        let normal = Tmc222Params::CATCHER.to_bytes();
        let mut slow = vec![0x89, 0xFF, 0xFF];
        slow.extend_from_slice(&homing);
        let mut fast = vec![0x89, 0xFF, 0xFF];
        fast.extend_from_slice(&normal);

        assert_eq!(
            bus.writes_to(CATCHER),
            vec![
                vec![0x81],
                slow,
                vec![0x86],
                vec![0x8B, 0xFF, 0xFF, 0x0C, 0x80],
                vec![0x8F],
                vec![0x81],
                vec![0x81],
                vec![0x86],
                fast,
            ]
        );
        assert_eq!(
            bus.ops().iter().filter(|op| **op == Op::Read(EXPANDER, 1)).count(),
            3
        );
        assert_eq!(motion.catcher_bin(), 0);

        // Position bookkeeping restarts from the mark
        bus.clear_ops();
        motion.move_catcher(ColorId::Red).unwrap();
        assert_eq!(set_positions(&bus, CATCHER), vec![356]);
    }

    #[test]
    fn test_homing_aborts_on_bus_error() {
        let (mut motion, bus) = controller();
        bus.fail(EXPANDER);
        assert!(motion.home_conveyor().is_err());
    }

    #[test]
    fn test_failed_status_read_keeps_last_status() {
        let (mut motion, bus) = controller();
        bus.reply(CATCHER, &status(5));
        assert!(!motion.is_catcher_idle());
        bus.fail(CATCHER);
        assert!(!motion.is_catcher_idle());
        assert_eq!(motion.catcher_status().motion, 5);
    }
}
