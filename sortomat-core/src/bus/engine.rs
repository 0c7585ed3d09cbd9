//! Bus engine
//!
//! Interrupt-side protocol state machine. The foreground loads a
//! transaction with [`BusEngine::begin`]; from then on every wire event is
//! fed to [`BusEngine::on_event`], which answers with the next wire action.
//! The engine never blocks and never touches hardware itself.
//!
//! ```text
//! Ready ──begin──► Busy ──► TxComplete | RxComplete | Error ──take──► Ready
//! ```

use sortomat_hal::twi::{status, Direction, TwiAction, TwiEvent};

use super::error::{BusFault, TwiError};
use super::transaction::Transaction;

/// Transaction buffer capacity, address byte included
pub const BUFFER_SIZE: usize = 64;

/// Bus engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStatus {
    /// No transaction loaded, or the last result was consumed
    Ready,
    /// Transaction in flight; the buffer belongs to the interrupt
    Busy,
    /// Write transaction finished
    TxComplete,
    /// Read transaction finished, data waiting in the buffer
    RxComplete,
    /// Transaction ended with a terminal wire fault
    Error,
}

/// Two-wire protocol engine
#[derive(Debug)]
pub struct BusEngine {
    buf: [u8; BUFFER_SIZE],
    len: usize,
    cursor: usize,
    status: BusStatus,
    fault: Option<BusFault>,
    arbitration_restarts: u32,
}

impl Default for BusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BusEngine {
    pub const fn new() -> Self {
        Self {
            buf: [0; BUFFER_SIZE],
            len: 0,
            cursor: 0,
            status: BusStatus::Ready,
            fault: None,
            arbitration_restarts: 0,
        }
    }

    pub fn status(&self) -> BusStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == BusStatus::Busy
    }

    /// Last terminal fault; only meaningful while status is `Error`
    pub fn fault(&self) -> Option<BusFault> {
        match self.status {
            BusStatus::Error => self.fault,
            _ => None,
        }
    }

    /// Number of transparent restarts after arbitration loss
    pub fn arbitration_restarts(&self) -> u32 {
        self.arbitration_restarts
    }

    /// Load a transaction and return the first wire action
    ///
    /// Rejected with [`TwiError::Busy`] while another transaction is in
    /// flight. An unconsumed result of a finished transaction is discarded.
    pub fn begin(&mut self, transaction: &Transaction) -> Result<TwiAction, TwiError> {
        if self.is_busy() {
            return Err(TwiError::Busy);
        }

        let bytes = transaction.as_bytes();
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        self.cursor = 0;
        self.fault = None;
        self.status = BusStatus::Busy;

        Ok(TwiAction::Start)
    }

    /// Advance the protocol on a wire event
    ///
    /// Returns the next wire action, or `None` when there is nothing to do
    /// (events arriving outside a transaction are ignored).
    pub fn on_event(&mut self, event: TwiEvent) -> Option<TwiAction> {
        if !self.is_busy() {
            return None;
        }

        match event {
            TwiEvent::Start | TwiEvent::RepeatedStart => {
                self.cursor = 0;
                Some(self.transmit_next())
            }
            TwiEvent::AddressAcked(Direction::Write) | TwiEvent::DataAcked => {
                if self.cursor < self.len {
                    Some(self.transmit_next())
                } else {
                    self.status = BusStatus::TxComplete;
                    Some(TwiAction::Stop)
                }
            }
            TwiEvent::AddressAcked(Direction::Read) => Some(self.receive_next()),
            TwiEvent::DataReceived { byte, acked } => {
                self.store(byte);
                if acked {
                    Some(self.receive_next())
                } else {
                    self.status = BusStatus::RxComplete;
                    Some(TwiAction::Stop)
                }
            }
            TwiEvent::ArbitrationLost => {
                self.fault = Some(BusFault::from_status(status::ARB_LOST));
                self.arbitration_restarts = self.arbitration_restarts.wrapping_add(1);
                Some(TwiAction::Start)
            }
            TwiEvent::AddressNacked(_) | TwiEvent::DataNacked | TwiEvent::BusError => {
                self.fault = Some(BusFault::from_status(event.status_code()));
                self.status = BusStatus::Error;
                Some(TwiAction::Stop)
            }
        }
    }

    /// Copy received bytes out and release the result
    ///
    /// Returns the number of bytes copied. Fails with [`TwiError::NoData`]
    /// when the last transaction received nothing, and with the wire fault
    /// when it ended in `Error`.
    pub fn take_result(&mut self, out: &mut [u8]) -> Result<usize, TwiError> {
        match self.status {
            BusStatus::Busy => Err(TwiError::Busy),
            BusStatus::RxComplete => {
                let received = &self.buf[1..self.len];
                let n = received.len().min(out.len());
                out[..n].copy_from_slice(&received[..n]);
                self.status = BusStatus::Ready;
                Ok(n)
            }
            BusStatus::Error => {
                self.status = BusStatus::Ready;
                Err(self.fault.map_or(TwiError::NoData, TwiError::Bus))
            }
            BusStatus::TxComplete => {
                self.status = BusStatus::Ready;
                Err(TwiError::NoData)
            }
            BusStatus::Ready => Err(TwiError::NoData),
        }
    }

    /// Release the result of a write
    pub fn finish(&mut self) -> Result<(), TwiError> {
        match self.status {
            BusStatus::Busy => Err(TwiError::Busy),
            BusStatus::Error => {
                self.status = BusStatus::Ready;
                Err(self.fault.map_or(TwiError::NoData, TwiError::Bus))
            }
            _ => {
                self.status = BusStatus::Ready;
                Ok(())
            }
        }
    }

    fn transmit_next(&mut self) -> TwiAction {
        let byte = self.buf[self.cursor];
        self.cursor += 1;
        TwiAction::Transmit(byte)
    }

    /// Every byte but the last is acknowledged
    fn receive_next(&self) -> TwiAction {
        TwiAction::Receive {
            ack: self.cursor + 1 < self.len,
        }
    }

    fn store(&mut self, byte: u8) {
        if self.cursor < self.len {
            self.buf[self.cursor] = byte;
            self.cursor += 1;
        }
    }
}
