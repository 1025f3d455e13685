//! Packed board version word.

use core::fmt;

const FIRMWARE_MASK: u16 = 0x0fff;
const REVISION_SHIFT: u16 = 12;
const REVISION_MASK: u16 = 0x000f;

/// Firmware number (12 bits) and revision (4 bits) packed into one word.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Version(u16);

impl Version {
    /// Packs a firmware number and revision, truncating each to its field width.
    #[must_use]
    pub const fn new(firmware: u16, revision: u8) -> Self {
        let revision = (revision as u16) & REVISION_MASK;
        Self((revision << REVISION_SHIFT) | (firmware & FIRMWARE_MASK))
    }

    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn firmware(self) -> u16 {
        self.0 & FIRMWARE_MASK
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn revision(self) -> u8 {
        ((self.0 >> REVISION_SHIFT) & REVISION_MASK) as u8
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.firmware(), self.revision())
    }
}
