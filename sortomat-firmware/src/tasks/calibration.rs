//! Colour table persistence task
//!
//! Owns the flash storage. Saves the table the sorter hands over and reads
//! it back on request; flash access never happens on the foreground.

use defmt::*;
use embassy_futures::select::{select, Either};

use sortomat_hal_rp2040::flash::FlashStorage;

use crate::channels::{COLOR_RESTORE, COLOR_SAVE, COLOR_TABLE_LOADED};
use crate::config::{load_color_table, save_color_table};

#[embassy_executor::task]
pub async fn calibration_task(mut storage: FlashStorage<'static>) {
    info!("Calibration task started");

    loop {
        match select(COLOR_SAVE.wait(), COLOR_RESTORE.wait()).await {
            Either::First(table) => match save_color_table(&mut storage, &table).await {
                Ok(()) => {
                    info!("Colour table saved successfully");
                }
                Err(e) => {
                    error!("Failed to save colour table: {:?}", e);
                }
            },
            Either::Second(()) => match load_color_table(&mut storage).await {
                Some(table) => COLOR_TABLE_LOADED.signal(table),
                None => warn!("Restore requested but no colour table available"),
            },
        }
    }
}
