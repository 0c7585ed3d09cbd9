//! RP2040-specific HAL for the colour sorter firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `sortomat-hal` traits:
//!
//! - Bit-banged two-wire controller that executes [`TwiAction`]s and
//!   reports [`TwiEvent`]s (the RP2040 has no event-driven TWI peripheral)
//! - Flash storage driver (implements `sortomat_hal::FlashStorage`)
//!
//! [`TwiAction`]: sortomat_hal::TwiAction
//! [`TwiEvent`]: sortomat_hal::TwiEvent

#![no_std]

pub mod flash;
pub mod twi;

// Re-export shared traits from sortomat-hal for convenience
pub use sortomat_hal::{FlashStorage as FlashStorageTrait, StorageKey};
