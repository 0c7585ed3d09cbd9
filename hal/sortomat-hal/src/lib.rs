//! Sortomat Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits shared by the sorter
//! core, the device drivers and the chip-specific HALs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  sortomat-firmware                      │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ sortomat-core   │    │ sortomat-drivers│
//! │ (bus engine)    │◄───│ (RegisterBus)   │
//! └─────────────────┘    └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────┐
//! │  sortomat-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!          ┌─────────────────────┐
//!          │ sortomat-hal-rp2040 │
//!          └─────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`twi::TwiPort`] - Hand-off of wire actions to the bus hardware
//! - [`twi::RegisterBus`] - Register-level device protocol used by drivers
//! - [`flash::FlashStorage`] - Persistent storage

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod twi;

// Re-export key traits at crate root for convenience
pub use flash::{FlashStorage, StorageKey};
pub use twi::{Direction, RegisterBus, TwiAction, TwiEvent, TwiPort};
