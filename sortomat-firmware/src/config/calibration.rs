//! Colour table persistence
//!
//! Loads and saves the learned reference colour table as a flat block of
//! little-endian RGBW quadruples.

use defmt::*;

use sortomat_core::color::{ColorTable, COLOR_TABLE_BYTES};
use sortomat_hal_rp2040::flash::{FlashError, FlashStorage, StorageKey};
use sortomat_hal_rp2040::FlashStorageTrait;

/// Colour table persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Flash operation failed
    Flash(FlashError),
    /// Stored block has the wrong size
    InvalidLength(usize),
}

impl From<FlashError> for CalibrationError {
    fn from(e: FlashError) -> Self {
        CalibrationError::Flash(e)
    }
}

/// Load the colour table from flash
///
/// Returns `None` if nothing is stored or the stored block is unusable;
/// the caller keeps the table it already has.
pub async fn load_color_table(storage: &mut FlashStorage<'_>) -> Option<ColorTable> {
    match load_color_table_inner(storage).await {
        Ok(table) => {
            info!("Loaded colour table from flash");
            Some(table)
        }
        Err(CalibrationError::Flash(FlashError::NotFound)) => {
            debug!("No colour table in flash");
            None
        }
        Err(e) => {
            warn!("Failed to load colour table: {:?}", e);
            None
        }
    }
}

async fn load_color_table_inner(
    storage: &mut FlashStorage<'_>,
) -> Result<ColorTable, CalibrationError> {
    // One spare byte so an oversized block is reported, not truncated
    let mut buffer = [0u8; COLOR_TABLE_BYTES + 1];
    let len = storage.read(StorageKey::ColorTable, &mut buffer).await?;

    debug!("Read {} bytes of colour table from flash", len);

    ColorTable::from_bytes(&buffer[..len]).ok_or(CalibrationError::InvalidLength(len))
}

/// Save the colour table to flash
pub async fn save_color_table(
    storage: &mut FlashStorage<'_>,
    table: &ColorTable,
) -> Result<(), CalibrationError> {
    let bytes = table.to_bytes();

    debug!("Saving {} bytes of colour table to flash", bytes.len());

    storage.write(StorageKey::ColorTable, &bytes).await?;

    info!("Saved colour table to flash");
    Ok(())
}
