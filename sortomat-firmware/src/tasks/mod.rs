//! Embassy async tasks
//!
//! `twi_irq_task`, `tick_task` and `console_task` run on the interrupt
//! executor so they preempt the spinning foreground; `calibration_task`
//! and the foreground run in thread mode.

pub mod calibration;
pub mod console;
pub mod tick;
pub mod twi;

pub use calibration::calibration_task;
pub use console::console_task;
pub use tick::tick_task;
pub use twi::twi_irq_task;
