//! Device drivers for the colour sorter
//!
//! This crate provides concrete implementations of the collaborator
//! traits defined in sortomat-core, on top of the generic
//! [`RegisterBus`](sortomat_hal::RegisterBus) device protocol:
//!
//! - Stepper controllers (TMC222)
//! - Colour sensor (ADJD-S311) and its LED driver (TLC59116)
//! - I/O expander with light barriers and the ejector solenoid
//! - Motion controller for catcher and conveyor
//! - Colour sensor head (gain/LED calibration, averaged readings)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod motion;
pub mod sensor;
pub mod stepper;

#[cfg(test)]
pub(crate) mod mock;
