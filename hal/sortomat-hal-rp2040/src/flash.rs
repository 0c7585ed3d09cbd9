//! Flash storage driver for RP2040
//!
//! Keeps persisted items (the learned colour table) in a small
//! sequential-storage map at the top of the Pico's flash, away from the
//! program image.

use core::ops::Range;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use sortomat_hal::flash::{FlashError, StorageKey};

/// Total flash on the Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Two erase sectors are the minimum sequential-storage needs to rotate
pub const STORE_SIZE: usize = 2 * embassy_rp::flash::ERASE_SIZE;

/// Flash range holding the key-value store
pub const STORE_RANGE: Range<u32> = (FLASH_SIZE - STORE_SIZE) as u32..FLASH_SIZE as u32;

/// Largest item the store moves in one piece
const ITEM_SIZE: usize = 128;

pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

impl sortomat_hal::FlashStorage for Rp2040FlashStorage<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut scratch = [0u8; ITEM_SIZE];

        let item = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut scratch,
            &key,
        )
        .await
        .map_err(|_| FlashError::Storage)?
        .ok_or(FlashError::NotFound)?;

        let target = buffer
            .get_mut(..item.len())
            .ok_or(FlashError::BufferTooSmall)?;
        target.copy_from_slice(item);
        Ok(item.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if data.len() > ITEM_SIZE {
            return Err(FlashError::BufferTooSmall);
        }
        let mut scratch = [0u8; ITEM_SIZE];

        map::store_item(
            &mut self.flash,
            STORE_RANGE,
            &mut NoCache::new(),
            &mut scratch,
            &key,
            &data,
        )
        .await
        .map_err(|_| FlashError::Storage)
    }
}

/// Type alias used by the firmware
pub type FlashStorage<'d> = Rp2040FlashStorage<'d>;
