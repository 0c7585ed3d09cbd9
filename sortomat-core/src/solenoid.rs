//! Solenoid pulse sub-machine
//!
//! Non-blocking ejector pulse: the foreground requests an activation and
//! moves on; the millisecond tick counts the on and off phases down and
//! posts an expiry event that the next foreground poll reacts to.
//!
//! ```text
//! Idle ──request──► Busy(on) ──on expired──► Busy(off) ──off expired──► Idle
//! ```
//!
//! Both countdowns are only ever decremented by [`Solenoid::tick`] and only
//! armed by [`Solenoid::poll`] while they are zero. Expiry events travel
//! through a single atomic slot that the foreground swaps empty, so no
//! event is lost and no critical section is needed.

use portable_atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::traits::SolenoidDriver;

/// Pulse timing in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SolenoidTiming {
    /// Time the coil stays energized
    pub on_ms: u16,
    /// Recovery time after de-energizing
    pub off_ms: u16,
}

impl Default for SolenoidTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl SolenoidTiming {
    /// 400 ms on, 400 ms off
    pub const DEFAULT: Self = Self {
        on_ms: 400,
        off_ms: 400,
    };
}

/// Sub-machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SolenoidState {
    Idle = 0,
    Busy = 1,
}

const NO_EVENT: u8 = 0;
const ON_EXPIRED: u8 = 1;
const OFF_EXPIRED: u8 = 2;

/// Solenoid timing sub-machine, shareable between tick interrupt and
/// foreground
pub struct Solenoid {
    state: AtomicU8,
    requested: AtomicBool,
    event: AtomicU8,
    on_timer: AtomicU16,
    off_timer: AtomicU16,
    timing: SolenoidTiming,
}

impl Default for Solenoid {
    fn default() -> Self {
        Self::new(SolenoidTiming::DEFAULT)
    }
}

impl Solenoid {
    pub const fn new(timing: SolenoidTiming) -> Self {
        Self {
            state: AtomicU8::new(SolenoidState::Idle as u8),
            requested: AtomicBool::new(false),
            event: AtomicU8::new(NO_EVENT),
            on_timer: AtomicU16::new(0),
            off_timer: AtomicU16::new(0),
            timing,
        }
    }

    pub fn state(&self) -> SolenoidState {
        match self.state.load(Ordering::Acquire) {
            0 => SolenoidState::Idle,
            _ => SolenoidState::Busy,
        }
    }

    /// Ejection complete: the sub-machine is back in `Idle`
    pub fn is_idle(&self) -> bool {
        self.state() == SolenoidState::Idle
    }

    /// Ask for one pulse; taken up by the next [`poll`](Self::poll)
    ///
    /// A request that reaches a busy machine is dropped.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Millisecond timer interrupt entry point
    pub fn tick(&self) {
        if countdown(&self.on_timer) {
            self.event.store(ON_EXPIRED, Ordering::Release);
        }
        if countdown(&self.off_timer) {
            self.event.store(OFF_EXPIRED, Ordering::Release);
        }
    }

    /// Foreground step: react to expiries and pending requests
    pub fn poll(&self, driver: &mut impl SolenoidDriver) {
        let event = self.event.swap(NO_EVENT, Ordering::AcqRel);
        let requested = self.requested.swap(false, Ordering::AcqRel);

        match (self.state(), event) {
            (SolenoidState::Busy, ON_EXPIRED) => {
                driver.set_energized(false);
                self.off_timer
                    .store(self.timing.off_ms.max(1), Ordering::Release);
            }
            (SolenoidState::Busy, OFF_EXPIRED) => {
                self.set_state(SolenoidState::Idle);
            }
            _ => {}
        }

        if requested && self.state() == SolenoidState::Idle {
            driver.set_energized(true);
            self.set_state(SolenoidState::Busy);
            self.on_timer
                .store(self.timing.on_ms.max(1), Ordering::Release);
        }
    }

    fn set_state(&self, state: SolenoidState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Decrement a running countdown; true when it just reached zero
fn countdown(timer: &AtomicU16) -> bool {
    timer
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(1))
        .is_ok_and(|previous| previous == 1)
}
