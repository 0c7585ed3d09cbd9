//! Bus transactions
//!
//! A transaction is the byte sequence handed to the engine: the address
//! byte (7-bit address shifted left, direction in bit 0) followed by the
//! payload. For reads the payload bytes are placeholders the engine fills.

use heapless::Vec;

use sortomat_hal::twi::{address_byte, Direction};

use super::engine::BUFFER_SIZE;
use super::error::TwiError;

/// Highest valid 7-bit target address
const MAX_ADDRESS: u8 = 0x7F;

/// One addressed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    bytes: Vec<u8, BUFFER_SIZE>,
}

impl Transaction {
    /// Transfer writing `payload` to `address`
    pub fn write(address: u8, payload: &[u8]) -> Result<Self, TwiError> {
        let mut bytes = Self::header(address, Direction::Write)?;
        bytes
            .extend_from_slice(payload)
            .map_err(|_| TwiError::BufferOverflow)?;
        Ok(Self { bytes })
    }

    /// Transfer reading `count` bytes from `address`
    pub fn read(address: u8, count: usize) -> Result<Self, TwiError> {
        if count == 0 {
            return Err(TwiError::EmptyRead);
        }
        let mut bytes = Self::header(address, Direction::Read)?;
        bytes
            .resize(count + 1, 0)
            .map_err(|_| TwiError::BufferOverflow)?;
        Ok(Self { bytes })
    }

    fn header(address: u8, direction: Direction) -> Result<Vec<u8, BUFFER_SIZE>, TwiError> {
        if address > MAX_ADDRESS {
            return Err(TwiError::InvalidAddress);
        }
        let mut bytes = Vec::new();
        // Capacity is never zero
        let _ = bytes.push(address_byte(address, direction));
        Ok(bytes)
    }

    /// 7-bit target address
    pub fn address(&self) -> u8 {
        self.bytes[0] >> 1
    }

    pub fn direction(&self) -> Direction {
        Direction::of_address_byte(self.bytes[0])
    }

    /// Address byte followed by the payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length (without the address byte)
    pub fn payload_len(&self) -> usize {
        self.bytes.len() - 1
    }
}
