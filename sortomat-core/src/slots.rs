//! Conveyor slot table
//!
//! Circular record of the colour classified for each conveyor slot. The
//! index follows the conveyor: it moves by one slot for every two
//! half-slot steps the conveyor makes.

use crate::color::ColorId;

/// Number of slots on the conveyor wheel
pub const CONVEYOR_SLOTS: usize = 10;

/// Slot offset between the sensor and the catcher drop point
pub const CATCHER_OFFSET: usize = 4;

/// Slot offset of the object measured before the current one
pub const PREVIOUS_OFFSET: usize = CONVEYOR_SLOTS - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConveyorSlots {
    slots: [ColorId; CONVEYOR_SLOTS],
    index: usize,
}

impl Default for ConveyorSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl ConveyorSlots {
    pub const fn new() -> Self {
        Self {
            slots: [ColorId::Unknown; CONVEYOR_SLOTS],
            index: 0,
        }
    }

    /// Forget every slot and return to index 0
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Slot under the colour sensor
    pub fn index(&self) -> usize {
        self.index
    }

    /// Follow a conveyor move of `half_slots` half-slot steps
    ///
    /// Rounds towards negative infinity, so one half step back moves the
    /// index back one slot.
    pub fn advance(&mut self, half_slots: i8) {
        let slots = i32::from(half_slots).div_euclid(2);
        let index = self.index as i32 + slots;
        self.index = index.rem_euclid(CONVEYOR_SLOTS as i32) as usize;
    }

    /// Colour in the slot `offset` positions ahead of the sensor
    pub fn ahead(&self, offset: usize) -> ColorId {
        self.slots[self.position(offset)]
    }

    pub fn set_ahead(&mut self, offset: usize, color: ColorId) {
        let position = self.position(offset);
        self.slots[position] = color;
    }

    pub fn current(&self) -> ColorId {
        self.ahead(0)
    }

    pub fn set_current(&mut self, color: ColorId) {
        self.set_ahead(0, color);
    }

    fn position(&self, offset: usize) -> usize {
        (self.index + offset) % CONVEYOR_SLOTS
    }
}
