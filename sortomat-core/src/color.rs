//! Colour classes and the reference colour table
//!
//! The table holds one calibrated RGBW quadruple per colour class and is
//! persisted as a flat block (nine quadruples of little-endian `u16`, no
//! header, no checksum).

/// Recognised colour classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ColorId {
    /// Empty slot or unrecognised object
    #[default]
    Unknown = 0,
    Red = 1,
    Orange = 2,
    Yellow = 3,
    Green = 4,
    Blue = 5,
    Violet = 6,
    Pink = 7,
    Brown = 8,
}

impl ColorId {
    /// Number of colour classes
    pub const COUNT: usize = 9;

    /// All classes in index order
    pub const ALL: [ColorId; Self::COUNT] = [
        ColorId::Unknown,
        ColorId::Red,
        ColorId::Orange,
        ColorId::Yellow,
        ColorId::Green,
        ColorId::Blue,
        ColorId::Violet,
        ColorId::Pink,
        ColorId::Brown,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Red, green, blue and clear channel readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgbw {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub clear: u16,
}

impl Rgbw {
    pub const fn new(red: u16, green: u16, blue: u16, clear: u16) -> Self {
        Self {
            red,
            green,
            blue,
            clear,
        }
    }

    /// Squared distance over red, green and blue
    ///
    /// The clear channel tracks overall brightness and is left out.
    pub fn distance_squared(&self, other: &Rgbw) -> u32 {
        let d = |a: u16, b: u16| {
            let diff = a.abs_diff(b) as u32;
            diff * diff
        };
        d(self.red, other.red) + d(self.green, other.green) + d(self.blue, other.blue)
    }

    /// Exponential update: 7/8 of `self`, 1/8 of `sample`
    pub fn blend(&self, sample: &Rgbw) -> Rgbw {
        let mix = |old: u16, new: u16| ((7 * old as u32 + new as u32) >> 3) as u16;
        Rgbw {
            red: mix(self.red, sample.red),
            green: mix(self.green, sample.green),
            blue: mix(self.blue, sample.blue),
            clear: mix(self.clear, sample.clear),
        }
    }
}

/// Size of the persisted table in bytes
pub const COLOR_TABLE_BYTES: usize = ColorId::COUNT * 8;

/// Reference colour per class
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorTable {
    references: [Rgbw; ColorId::COUNT],
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::FACTORY
    }
}

impl ColorTable {
    /// Factory calibration
    pub const FACTORY: Self = Self {
        references: [
            Rgbw::new(80, 80, 60, 90),
            Rgbw::new(348, 127, 81, 241),
            Rgbw::new(386, 165, 96, 279),
            Rgbw::new(406, 316, 147, 373),
            Rgbw::new(257, 290, 143, 294),
            Rgbw::new(245, 325, 282, 353),
            Rgbw::new(209, 230, 228, 283),
            Rgbw::new(296, 188, 182, 285),
            Rgbw::new(219, 147, 109, 203),
        ],
    };

    pub fn reference(&self, color: ColorId) -> &Rgbw {
        &self.references[color.index()]
    }

    pub fn set_reference(&mut self, color: ColorId, reference: Rgbw) {
        self.references[color.index()] = reference;
    }

    /// Nearest reference colour; ties go to the lower class index
    pub fn classify(&self, sample: &Rgbw) -> ColorId {
        let mut best = ColorId::Unknown;
        let mut best_distance = u32::MAX;
        for color in ColorId::ALL {
            let distance = self.reference(color).distance_squared(sample);
            if distance < best_distance {
                best_distance = distance;
                best = color;
            }
        }
        best
    }

    /// Pull the reference of `color` one eighth towards `sample`
    pub fn correct(&mut self, color: ColorId, sample: &Rgbw) {
        let updated = self.reference(color).blend(sample);
        self.set_reference(color, updated);
    }

    /// Flat little-endian block: red, green, blue, clear per class
    pub fn to_bytes(&self) -> [u8; COLOR_TABLE_BYTES] {
        let mut out = [0u8; COLOR_TABLE_BYTES];
        for (chunk, reference) in out.chunks_exact_mut(8).zip(self.references.iter()) {
            chunk[0..2].copy_from_slice(&reference.red.to_le_bytes());
            chunk[2..4].copy_from_slice(&reference.green.to_le_bytes());
            chunk[4..6].copy_from_slice(&reference.blue.to_le_bytes());
            chunk[6..8].copy_from_slice(&reference.clear.to_le_bytes());
        }
        out
    }

    /// Parse a flat block; `None` unless exactly [`COLOR_TABLE_BYTES`] long
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != COLOR_TABLE_BYTES {
            return None;
        }
        let mut table = Self::FACTORY;
        for (reference, chunk) in table.references.iter_mut().zip(bytes.chunks_exact(8)) {
            let word = |i: usize| u16::from_le_bytes([chunk[i], chunk[i + 1]]);
            *reference = Rgbw::new(word(0), word(2), word(4), word(6));
        }
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_references_classify_as_themselves() {
        let table = ColorTable::FACTORY;
        for color in ColorId::ALL {
            assert_eq!(table.classify(table.reference(color)), color);
        }
    }

    #[test]
    fn test_classify_ignores_clear_channel() {
        let table = ColorTable::FACTORY;
        let mut sample = *table.reference(ColorId::Blue);
        sample.clear = 0;
        assert_eq!(table.classify(&sample), ColorId::Blue);
    }

    #[test]
    fn test_dark_sample_is_unknown() {
        let table = ColorTable::FACTORY;
        assert_eq!(table.classify(&Rgbw::new(70, 75, 55, 80)), ColorId::Unknown);
    }

    #[test]
    fn test_tie_prefers_lower_index() {
        let mut table = ColorTable::FACTORY;
        let shared = Rgbw::new(500, 500, 500, 500);
        table.set_reference(ColorId::Green, shared);
        table.set_reference(ColorId::Pink, shared);
        assert_eq!(table.classify(&shared), ColorId::Green);
    }

    #[test]
    fn test_correct_updates_every_channel() {
        let mut table = ColorTable::FACTORY;
        table.set_reference(ColorId::Red, Rgbw::new(800, 800, 800, 800));
        table.correct(ColorId::Red, &Rgbw::new(0, 80, 160, 1600));
        assert_eq!(
            *table.reference(ColorId::Red),
            Rgbw::new(700, 710, 720, 900)
        );
    }

    #[test]
    fn test_flat_block_layout() {
        let bytes = ColorTable::FACTORY.to_bytes();
        assert_eq!(bytes.len(), 72);
        // Unknown.red = 80, little endian
        assert_eq!(&bytes[0..2], &[80, 0]);
        // Red.red = 348 = 0x015C
        assert_eq!(&bytes[8..10], &[0x5C, 0x01]);
        assert_eq!(ColorTable::from_bytes(&bytes), Some(ColorTable::FACTORY));
        assert_eq!(ColorTable::from_bytes(&bytes[..71]), None);
    }

    #[test]
    fn test_color_index_bounds() {
        assert_eq!(ColorId::from_index(8), Some(ColorId::Brown));
        assert_eq!(ColorId::from_index(9), None);
    }
}
