//! Persistent storage abstraction
//!
//! The sorter persists a single item, the learned colour table. Chip HALs
//! back this with a key-value store in their program flash.

/// Identifies a persisted item; encoded as one byte in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Reference colour table (flat block of RGBW quadruples)
    ColorTable = 0,
}

impl StorageKey {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::ColorTable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Flash driver reported an error
    Flash,
    /// Store is corrupt or full
    Storage,
    /// Nothing stored under the key
    NotFound,
    /// Item does not fit the caller's buffer or the store's item size
    BufferTooSmall,
}

/// Key-value store in non-volatile memory
pub trait FlashStorage {
    /// Copy the item stored under `key` into `buffer`, returning its length
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, FlashError>>;

    /// Replace the item stored under `key`
    fn write(
        &mut self,
        key: StorageKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), FlashError>>;
}

#[cfg(feature = "sequential-storage")]
mod sequential_storage_key {
    use sequential_storage::map::{Key, SerializationError};

    use super::StorageKey;

    impl Key for StorageKey {
        fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
            let slot = buffer.first_mut().ok_or(SerializationError::BufferTooSmall)?;
            *slot = self.as_u8();
            Ok(1)
        }

        fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
            let byte = buffer.first().ok_or(SerializationError::BufferTooSmall)?;
            let key = StorageKey::from_u8(*byte).ok_or(SerializationError::InvalidFormat)?;
            Ok((key, 1))
        }
    }
}
