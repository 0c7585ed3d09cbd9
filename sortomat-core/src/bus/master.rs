//! Shared bus object
//!
//! [`Bus`] is the one place where foreground and bus interrupt meet. All
//! engine state sits behind a critical section; wire actions are handed to
//! the port only after the critical section is released, so the port may
//! run the action synchronously and re-enter [`Bus::on_interrupt`].

use core::cell::RefCell;

use critical_section::Mutex;
use sortomat_hal::twi::{TwiEvent, TwiPort};

use super::engine::{BusEngine, BusStatus};
use super::error::{BusFault, TwiError};
use super::transaction::Transaction;
use super::twi::Twi;

/// Bus engine plus the hardware port it drives
pub struct Bus<P> {
    engine: Mutex<RefCell<BusEngine>>,
    port: P,
}

impl<P: TwiPort> Bus<P> {
    /// Create a bus; usable in a `static`
    pub const fn new(port: P) -> Self {
        Self {
            engine: Mutex::new(RefCell::new(BusEngine::new())),
            port,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Blocking transaction layer handle
    pub fn twi(&self) -> Twi<'_, P> {
        Twi::new(self)
    }

    /// Begin an asynchronous transaction
    pub fn start(&self, transaction: &Transaction) -> Result<(), TwiError> {
        let action = self.with_engine(|engine| engine.begin(transaction))?;
        self.port.submit(action);
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.with_engine(|engine| engine.is_busy())
    }

    pub fn status(&self) -> BusStatus {
        self.with_engine(|engine| engine.status())
    }

    /// Fault of the last transaction, while status is `Error`
    pub fn fault(&self) -> Option<BusFault> {
        self.with_engine(|engine| engine.fault())
    }

    pub fn arbitration_restarts(&self) -> u32 {
        self.with_engine(|engine| engine.arbitration_restarts())
    }

    /// Spin until the engine leaves `Busy`
    ///
    /// There is no timeout: a transfer that never completes hangs the
    /// caller.
    pub fn wait(&self) {
        while self.is_busy() {
            core::hint::spin_loop();
        }
    }

    /// Copy received bytes out and reset status to `Ready`
    pub fn take_result(&self, out: &mut [u8]) -> Result<usize, TwiError> {
        self.with_engine(|engine| engine.take_result(out))
    }

    /// Consume the result of a write and reset status to `Ready`
    pub fn finish(&self) -> Result<(), TwiError> {
        self.with_engine(|engine| engine.finish())
    }

    /// Bus interrupt entry point
    pub fn on_interrupt(&self, event: TwiEvent) {
        if let Some(action) = self.with_engine(|engine| engine.on_event(event)) {
            self.port.submit(action);
        }
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut BusEngine) -> R) -> R {
        critical_section::with(|cs| f(&mut self.engine.borrow_ref_mut(cs)))
    }
}
