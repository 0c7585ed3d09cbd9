//! Bit-banged two-wire controller
//!
//! Drives SCL/SDA as open-drain lines (output low or released to the
//! pull-up) and turns every [`TwiAction`] into the [`TwiEvent`] a hardware
//! controller would report. Arbitration is checked on every released bit:
//! reading SDA low while we released it means another controller won.

use embassy_rp::gpio::{Flex, Pin, Pull};
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};

use sortomat_hal::twi::{Direction, TwiAction, TwiConfig, TwiEvent};

/// Where the controller is inside the current transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Bus released
    Idle,
    /// Start sent, next byte is the address
    Address,
    /// Address acknowledged for writing
    Writing,
    /// Address acknowledged for reading
    Reading,
    /// Address or data refused, waiting for stop
    Refused,
}

/// Open-drain bit-banged two-wire controller
pub struct BitBangTwi<'d> {
    scl: Flex<'d>,
    sda: Flex<'d>,
    half_period: Duration,
    phase: Phase,
}

impl<'d> BitBangTwi<'d> {
    /// Create a controller on the given clock and data pins
    pub fn new(scl: Peri<'d, impl Pin>, sda: Peri<'d, impl Pin>, config: TwiConfig) -> Self {
        let mut scl = Flex::new(scl);
        let mut sda = Flex::new(sda);
        scl.set_pull(Pull::Up);
        sda.set_pull(Pull::Up);
        scl.set_as_input();
        sda.set_as_input();

        Self {
            scl,
            sda,
            half_period: Duration::from_micros(config.half_period_us() as u64),
            phase: Phase::Idle,
        }
    }

    /// Execute one wire action
    ///
    /// Returns the resulting event, or `None` for a stop condition.
    pub fn execute(&mut self, action: TwiAction) -> Option<TwiEvent> {
        match action {
            TwiAction::Start => Some(self.start()),
            TwiAction::Transmit(byte) => Some(self.transmit(byte)),
            TwiAction::Receive { ack } => Some(self.receive(ack)),
            TwiAction::Stop => {
                self.stop();
                None
            }
        }
    }

    fn start(&mut self) -> TwiEvent {
        let repeated = self.phase != Phase::Idle;

        release(&mut self.sda);
        self.delay();
        release(&mut self.scl);
        self.wait_clock_high();
        self.delay();

        if self.sda.is_low() {
            self.abandon();
            return TwiEvent::ArbitrationLost;
        }

        drive_low(&mut self.sda);
        self.delay();
        drive_low(&mut self.scl);
        self.phase = Phase::Address;

        if repeated {
            TwiEvent::RepeatedStart
        } else {
            TwiEvent::Start
        }
    }

    fn transmit(&mut self, byte: u8) -> TwiEvent {
        if matches!(self.phase, Phase::Idle | Phase::Reading | Phase::Refused) {
            return TwiEvent::BusError;
        }

        for bit in (0..8).rev() {
            let high = byte & (1 << bit) != 0;
            if !self.write_bit(high) {
                self.abandon();
                return TwiEvent::ArbitrationLost;
            }
        }
        let acked = !self.read_bit();

        match self.phase {
            Phase::Address => {
                let direction = Direction::of_address_byte(byte);
                if !acked {
                    self.phase = Phase::Refused;
                    return TwiEvent::AddressNacked(direction);
                }
                self.phase = match direction {
                    Direction::Write => Phase::Writing,
                    Direction::Read => Phase::Reading,
                };
                TwiEvent::AddressAcked(direction)
            }
            _ if acked => TwiEvent::DataAcked,
            _ => {
                self.phase = Phase::Refused;
                TwiEvent::DataNacked
            }
        }
    }

    fn receive(&mut self, ack: bool) -> TwiEvent {
        if self.phase != Phase::Reading {
            return TwiEvent::BusError;
        }

        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | self.read_bit() as u8;
        }
        // ACK is a driven-low bit; arbitration cannot be lost here
        self.write_bit(!ack);

        TwiEvent::DataReceived { byte, acked: ack }
    }

    fn stop(&mut self) {
        drive_low(&mut self.sda);
        self.delay();
        release(&mut self.scl);
        self.wait_clock_high();
        self.delay();
        release(&mut self.sda);
        self.delay();
        self.phase = Phase::Idle;
    }

    /// Clock one bit out. Returns false if arbitration was lost.
    fn write_bit(&mut self, high: bool) -> bool {
        if high {
            release(&mut self.sda);
        } else {
            drive_low(&mut self.sda);
        }
        self.delay();
        release(&mut self.scl);
        self.wait_clock_high();
        let won = !high || self.sda.is_high();
        self.delay();
        drive_low(&mut self.scl);
        won
    }

    fn read_bit(&mut self) -> bool {
        release(&mut self.sda);
        self.delay();
        release(&mut self.scl);
        self.wait_clock_high();
        let bit = self.sda.is_high();
        self.delay();
        drive_low(&mut self.scl);
        bit
    }

    /// Targets may stretch the clock by holding SCL low
    fn wait_clock_high(&mut self) {
        while self.scl.is_low() {}
    }

    /// Give the bus to the winning controller
    fn abandon(&mut self) {
        release(&mut self.sda);
        release(&mut self.scl);
        self.phase = Phase::Idle;
    }

    fn delay(&self) {
        block_for(self.half_period);
    }
}

fn release(pin: &mut Flex<'_>) {
    pin.set_as_input();
}

fn drive_low(pin: &mut Flex<'_>) {
    pin.set_low();
    pin.set_as_output();
}
