//! Two-wire bus master
//!
//! The [`BusEngine`] is the interrupt-side protocol state machine; it owns
//! the transaction buffer while a transfer is in flight. [`Bus`] wraps the
//! engine together with the hardware port and is the single object shared
//! between the foreground and the bus interrupt. [`Twi`] is the blocking
//! transaction layer every device driver uses.

pub mod engine;
pub mod error;
pub mod master;
pub mod transaction;
pub mod twi;

pub use engine::{BusEngine, BusStatus, BUFFER_SIZE};
pub use error::{BusFault, FaultKind, TwiError};
pub use master::Bus;
pub use transaction::Transaction;
pub use twi::Twi;
