//! Bus error taxonomy

use sortomat_hal::twi::status;

/// Terminal fault reported by the wire
///
/// Holds the raw controller status plus one, so a bus error (status 0x00)
/// never reads as "no error".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFault(u8);

/// Classification of a [`BusFault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// No target answered its address
    AddressNack,
    /// Target refused a data byte
    DataNack,
    /// Another controller won the bus
    ArbitrationLost,
    /// Illegal start/stop condition
    BusError,
    /// Status outside the known set
    Other,
}

impl BusFault {
    /// Fault from a raw controller status code
    pub const fn from_status(status: u8) -> Self {
        Self(status.wrapping_add(1))
    }

    /// Offset error code (status + 1, never zero)
    pub const fn code(&self) -> u8 {
        self.0
    }

    /// Raw controller status code
    pub const fn status(&self) -> u8 {
        self.0.wrapping_sub(1)
    }

    pub fn kind(&self) -> FaultKind {
        match self.status() {
            status::MT_SLA_NACK | status::MR_SLA_NACK => FaultKind::AddressNack,
            status::MT_DATA_NACK => FaultKind::DataNack,
            status::ARB_LOST => FaultKind::ArbitrationLost,
            status::BUS_ERROR => FaultKind::BusError,
            _ => FaultKind::Other,
        }
    }
}

/// Errors from the transaction layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiError {
    /// Transaction does not fit the engine buffer
    BufferOverflow,
    /// Result requested from a transaction that received nothing
    NoData,
    /// A transaction is already in flight
    Busy,
    /// Target address wider than 7 bits
    InvalidAddress,
    /// Read of zero bytes requested
    EmptyRead,
    /// Wire fault, terminal for the transaction
    Bus(BusFault),
}

impl From<BusFault> for TwiError {
    fn from(fault: BusFault) -> Self {
        TwiError::Bus(fault)
    }
}

impl embedded_hal::i2c::Error for TwiError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            TwiError::Bus(fault) => match fault.kind() {
                FaultKind::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
                FaultKind::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
                FaultKind::ArbitrationLost => ErrorKind::ArbitrationLoss,
                FaultKind::BusError => ErrorKind::Bus,
                FaultKind::Other => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }
}
