//! Foreground sorter loop
//!
//! Owns the sorter state machine and the bus-attached devices. Each pass
//! polls the solenoid pulse machine, then the sorter, then picks up a
//! colour table restored from flash, and yields so the thread-mode
//! calibration task gets to run.

use core::convert::Infallible;

use defmt::*;
use embassy_futures::yield_now;
use embassy_time::Delay;

use sortomat_core::bus::Twi;
use sortomat_core::color::{ColorId, ColorTable};
use sortomat_core::sorter::Sorter;
use sortomat_core::traits::{CalibrationStore, Operator};
use sortomat_drivers::motion::{Ejector, MotionController};
use sortomat_drivers::sensor::ColorSensorHead;

use crate::channels::{ChannelPort, COLOR_SAVE, COLOR_TABLE_LOADED, OPERATOR, SOLENOID};

/// Transaction layer handle on the shared bus
pub type SharedTwi = Twi<'static, ChannelPort>;

pub type BoardSorter = Sorter<
    'static,
    MotionController<SharedTwi>,
    ColorSensorHead<SharedTwi, Delay>,
    ConsoleOperator,
    SignalStore,
>;

/// Operator answering over the serial console
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn confirm_color(&mut self, proposed: ColorId) -> ColorId {
        info!("Learning: sensor says {:?}, answer 0-8", proposed);

        // The console task runs at interrupt priority and fills the channel
        loop {
            if let Ok(color) = OPERATOR.try_receive() {
                info!("Learning: operator says {:?}", color);
                return color;
            }
            core::hint::spin_loop();
        }
    }
}

/// Hands the table to the calibration task, which owns the flash
pub struct SignalStore;

impl CalibrationStore for SignalStore {
    type Error = Infallible;

    fn store(&mut self, colors: &ColorTable) -> Result<(), Infallible> {
        COLOR_SAVE.signal(colors.clone());
        Ok(())
    }
}

#[embassy_executor::task]
pub async fn sorter_task(mut sorter: BoardSorter, mut ejector: Ejector<SharedTwi>) {
    info!("Sorter task started");

    loop {
        SOLENOID.poll(&mut ejector);
        sorter.poll();

        if let Some(table) = COLOR_TABLE_LOADED.try_take() {
            info!("Applying restored colour table");
            sorter.set_colors(table);
        }

        yield_now().await;
    }
}
