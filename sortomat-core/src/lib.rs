//! Board-agnostic core logic for the colour sorter firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Two-wire bus engine and the blocking transaction layer on top of it
//! - Millisecond-timed solenoid pulse sub-machine
//! - Table-driven sorter state machine
//! - Reference colour table and conveyor slot table
//! - Control surface shared with the console
//! - Collaborator traits (motion, colour sensor, operator, persistence)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod color;
pub mod control;
pub mod slots;
pub mod solenoid;
pub mod sorter;
pub mod traits;

#[cfg(test)]
pub(crate) mod sim;
