//! Sorter control state machine
//!
//! A static, ordered table of `(from, to, guard)` rules drives the sorter
//! through initialization, homing, colour acquisition, classification,
//! learning and ejection. Each poll performs at most one transition and
//! runs the entry action of the new state exactly once.

pub mod machine;
pub mod state;
pub mod table;

pub use machine::Sorter;
pub use state::{Guard, GuardInputs, GuardSnapshot, SorterMode, SorterState};
pub use table::{next_state, Rule, RULES};
