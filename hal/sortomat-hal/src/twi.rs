//! Two-wire bus abstractions
//!
//! The bus is driven as a sequence of wire-level actions (start, transmit a
//! byte, receive a byte, stop). Each action except stop completes with a wire
//! event that carries the classic two-wire controller status code. The bus
//! engine in `sortomat-core` consumes events and produces the next action;
//! chip HALs only have to execute actions and report events.

/// Controller status codes reported after each wire action
pub mod status {
    /// Start condition transmitted
    pub const START: u8 = 0x08;
    /// Repeated start condition transmitted
    pub const REP_START: u8 = 0x10;
    /// SLA+W transmitted, ACK received
    pub const MT_SLA_ACK: u8 = 0x18;
    /// SLA+W transmitted, NACK received
    pub const MT_SLA_NACK: u8 = 0x20;
    /// Data byte transmitted, ACK received
    pub const MT_DATA_ACK: u8 = 0x28;
    /// Data byte transmitted, NACK received
    pub const MT_DATA_NACK: u8 = 0x30;
    /// Arbitration lost in SLA or data
    pub const ARB_LOST: u8 = 0x38;
    /// SLA+R transmitted, ACK received
    pub const MR_SLA_ACK: u8 = 0x40;
    /// SLA+R transmitted, NACK received
    pub const MR_SLA_NACK: u8 = 0x48;
    /// Data byte received, ACK returned
    pub const MR_DATA_ACK: u8 = 0x50;
    /// Data byte received, NACK returned
    pub const MR_DATA_NACK: u8 = 0x58;
    /// Illegal start or stop condition
    pub const BUS_ERROR: u8 = 0x00;
}

/// Transfer direction, encoded in bit 0 of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Controller transmits
    Write,
    /// Controller receives
    Read,
}

impl Direction {
    /// Direction bit as it appears on the wire
    pub const fn bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }

    /// Direction encoded in an address byte
    pub const fn of_address_byte(byte: u8) -> Self {
        if byte & 1 == 0 {
            Direction::Write
        } else {
            Direction::Read
        }
    }
}

/// Pack a 7-bit target address and direction into the first wire byte
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction.bit()
}

/// Wire-level event reported by the bus hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiEvent {
    /// Start condition observed on an idle bus
    Start,
    /// Start condition observed while the bus was held
    RepeatedStart,
    /// Target acknowledged its address
    AddressAcked(Direction),
    /// No target acknowledged the address
    AddressNacked(Direction),
    /// Target acknowledged a transmitted data byte
    DataAcked,
    /// Target refused a transmitted data byte
    DataNacked,
    /// A data byte was received; `acked` reports what the controller answered
    DataReceived { byte: u8, acked: bool },
    /// Another controller won the bus
    ArbitrationLost,
    /// Illegal start/stop condition
    BusError,
}

impl TwiEvent {
    /// Status code the classic controller reports for this event
    pub fn status_code(&self) -> u8 {
        match self {
            TwiEvent::Start => status::START,
            TwiEvent::RepeatedStart => status::REP_START,
            TwiEvent::AddressAcked(Direction::Write) => status::MT_SLA_ACK,
            TwiEvent::AddressAcked(Direction::Read) => status::MR_SLA_ACK,
            TwiEvent::AddressNacked(Direction::Write) => status::MT_SLA_NACK,
            TwiEvent::AddressNacked(Direction::Read) => status::MR_SLA_NACK,
            TwiEvent::DataAcked => status::MT_DATA_ACK,
            TwiEvent::DataNacked => status::MT_DATA_NACK,
            TwiEvent::DataReceived { acked: true, .. } => status::MR_DATA_ACK,
            TwiEvent::DataReceived { acked: false, .. } => status::MR_DATA_NACK,
            TwiEvent::ArbitrationLost => status::ARB_LOST,
            TwiEvent::BusError => status::BUS_ERROR,
        }
    }
}

/// Wire-level action requested by the bus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiAction {
    /// Generate a (repeated) start condition
    Start,
    /// Shift out one byte and sample the acknowledge bit
    Transmit(u8),
    /// Shift in one byte and answer with ACK or NACK
    Receive { ack: bool },
    /// Generate a stop condition; no event follows
    Stop,
}

/// Hardware side of the bus
///
/// `submit` is called from the foreground (to start a transaction) and from
/// the bus interrupt (to continue one). Implementations must not block; the
/// resulting [`TwiEvent`] is delivered later through the bus interrupt.
pub trait TwiPort {
    /// Queue an action for execution on the wire
    fn submit(&self, action: TwiAction);
}

/// Register-level device protocol
///
/// Every device driver talks to its chip through this trait. Calls block
/// until the transfer completed or failed.
pub trait RegisterBus {
    /// Error type for bus operations
    type Error: core::fmt::Debug;

    /// Write `value` into register `reg` of the device at `address`
    fn write_register(&mut self, address: u8, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Read register `reg` of the device at `address`
    fn read_register(&mut self, address: u8, reg: u8) -> Result<u8, Self::Error>;

    /// Write a raw byte block to the device at `address`
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read a raw byte block from the device at `address`
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Two-wire bus configuration
///
/// Only standard mode is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for TwiConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TwiConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Half of one clock period in microseconds
    pub const fn half_period_us(&self) -> u32 {
        500_000 / self.frequency
    }
}
