//! Control surface shared between the console and the foreground
//!
//! The console runs at a higher priority than the sorter loop, so every
//! field is an atomic that either side can touch without locking.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::color::ColorId;
use crate::sorter::SorterMode;

/// Mode, pause flag and persistence request
pub struct ControlPanel {
    mode: AtomicU8,
    paused: AtomicBool,
    store_requested: AtomicBool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel {
    /// Init mode, paused
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(SorterMode::Init as u8),
            paused: AtomicBool::new(true),
            store_requested: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> SorterMode {
        SorterMode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn set_mode(&self, mode: SorterMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    /// Ask the foreground to persist the colour table
    pub fn request_store(&self) {
        self.store_requested.store(true, Ordering::Release);
    }

    /// Consume a pending persistence request
    pub fn take_store_request(&self) -> bool {
        self.store_requested.swap(false, Ordering::AcqRel)
    }
}

/// Console command, one byte each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SetMode(SorterMode),
    TogglePause,
    /// Fire the ejector once
    Eject,
    /// Persist the colour table
    StoreColors,
    /// Reload the colour table from storage
    RestoreColors,
    /// Operator's answer to the learning prompt
    Answer(ColorId),
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'n' => Some(Command::SetMode(SorterMode::Running)),
            b'm' => Some(Command::SetMode(SorterMode::Learning)),
            b'b' => Some(Command::SetMode(SorterMode::Init)),
            b'P' => Some(Command::SetMode(SorterMode::Pause)),
            b'p' => Some(Command::TogglePause),
            b'e' => Some(Command::Eject),
            b'X' => Some(Command::StoreColors),
            b'Y' => Some(Command::RestoreColors),
            b'0'..=b'8' => ColorId::from_index(byte - b'0').map(Command::Answer),
            _ => None,
        }
    }
}
