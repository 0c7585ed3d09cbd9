//! Blocking transaction layer
//!
//! Every call waits for the engine to go idle, starts its transaction and
//! spins until the engine leaves `Busy`. A register read is two separate
//! transactions (pointer write, then read); nothing else uses the bus in
//! between because this is the only controller.

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use sortomat_hal::twi::{Direction, RegisterBus, TwiPort};

use super::engine::BUFFER_SIZE;
use super::error::TwiError;
use super::master::Bus;
use super::transaction::Transaction;

/// Copyable handle to a [`Bus`]
pub struct Twi<'a, P> {
    bus: &'a Bus<P>,
}

impl<P> Clone for Twi<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Twi<'_, P> {}

impl<'a, P: TwiPort> Twi<'a, P> {
    pub fn new(bus: &'a Bus<P>) -> Self {
        Self { bus }
    }

    /// Write `value` into register `reg`
    pub fn write_register(&self, address: u8, reg: u8, value: u8) -> Result<(), TwiError> {
        self.write(address, &[reg, value])
    }

    /// Select register `reg`, then read one byte
    pub fn read_register(&self, address: u8, reg: u8) -> Result<u8, TwiError> {
        self.write_byte(address, reg)?;
        self.read_byte(address)
    }

    pub fn write_byte(&self, address: u8, byte: u8) -> Result<(), TwiError> {
        self.write(address, &[byte])
    }

    pub fn read_byte(&self, address: u8) -> Result<u8, TwiError> {
        let mut byte = [0u8; 1];
        self.read(address, &mut byte)?;
        Ok(byte[0])
    }

    /// Write a byte block
    pub fn write(&self, address: u8, bytes: &[u8]) -> Result<(), TwiError> {
        let transaction = Transaction::write(address, bytes)?;
        self.run(&transaction)?;
        self.bus.finish()
    }

    /// Read `buf.len()` bytes; returns the number of bytes received
    pub fn read(&self, address: u8, buf: &mut [u8]) -> Result<usize, TwiError> {
        let transaction = Transaction::read(address, buf.len())?;
        self.run(&transaction)?;
        self.bus.take_result(buf)
    }

    /// Write `buf` or fill it, depending on `direction`
    ///
    /// Returns the number of payload bytes moved.
    pub fn transceive(
        &self,
        address: u8,
        direction: Direction,
        buf: &mut [u8],
    ) -> Result<usize, TwiError> {
        match direction {
            Direction::Write => self.write(address, buf).map(|()| buf.len()),
            Direction::Read => self.read(address, buf),
        }
    }

    fn run(&self, transaction: &Transaction) -> Result<(), TwiError> {
        self.bus.wait();
        self.bus.start(transaction)?;
        self.bus.wait();
        Ok(())
    }
}

impl<P: TwiPort> RegisterBus for Twi<'_, P> {
    type Error = TwiError;

    fn write_register(&mut self, address: u8, reg: u8, value: u8) -> Result<(), TwiError> {
        Twi::write_register(self, address, reg, value)
    }

    fn read_register(&mut self, address: u8, reg: u8) -> Result<u8, TwiError> {
        Twi::read_register(self, address, reg)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TwiError> {
        Twi::write(self, address, bytes)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), TwiError> {
        Twi::read(self, address, buf).map(|_| ())
    }
}

impl<P: TwiPort> ErrorType for Twi<'_, P> {
    type Error = TwiError;
}

/// Adjacent operations of the same kind are merged into one transfer.
/// A change of direction ends the transfer with a stop condition; there is
/// no repeated start.
impl<P: TwiPort> I2c<SevenBitAddress> for Twi<'_, P> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), TwiError> {
        let mut start = 0;
        while start < operations.len() {
            let writing = is_write(&operations[start]);
            let end = operations[start..]
                .iter()
                .position(|op| is_write(op) != writing)
                .map_or(operations.len(), |n| start + n);
            let run = &mut operations[start..end];

            if writing {
                let mut payload = heapless::Vec::<u8, BUFFER_SIZE>::new();
                for op in run.iter() {
                    if let Operation::Write(bytes) = op {
                        payload
                            .extend_from_slice(bytes)
                            .map_err(|_| TwiError::BufferOverflow)?;
                    }
                }
                Twi::write(self, address, &payload)?;
            } else {
                let total: usize = run.iter().map(operation_len).sum();
                let mut merged = [0u8; BUFFER_SIZE];
                let received = merged.get_mut(..total).ok_or(TwiError::BufferOverflow)?;
                Twi::read(self, address, received)?;

                let mut offset = 0;
                for op in run.iter_mut() {
                    if let Operation::Read(buf) = op {
                        buf.copy_from_slice(&received[offset..offset + buf.len()]);
                        offset += buf.len();
                    }
                }
            }
            start = end;
        }
        Ok(())
    }
}

fn is_write(operation: &Operation<'_>) -> bool {
    matches!(operation, Operation::Write(_))
}

fn operation_len(operation: &Operation<'_>) -> usize {
    match operation {
        Operation::Write(bytes) => bytes.len(),
        Operation::Read(buf) => buf.len(),
    }
}
