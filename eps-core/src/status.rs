//! Board status word, reset bookkeeping, and last-error tracking.
//!
//! Command validation flags and passive reset causes share a single 16-bit
//! status word. Manual resets are latched separately so they never disturb the
//! mutually exclusive watchdog/power-on/brown-out group.

use core::fmt;

/// Constant firmware checksum reported by `GET_CHECKSUM`.
pub const CHECKSUM: u16 = 0xdead;

/// Bit positions within the board status word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusBit {
    InvalidCommand,
    ResetWatchdog,
    InvalidData,
    InvalidChannel,
    EepromError,
    ResetPowerOn,
    ResetBrownOut,
}

impl StatusBit {
    pub const ALL: [StatusBit; 7] = [
        StatusBit::InvalidCommand,
        StatusBit::ResetWatchdog,
        StatusBit::InvalidData,
        StatusBit::InvalidChannel,
        StatusBit::EepromError,
        StatusBit::ResetPowerOn,
        StatusBit::ResetBrownOut,
    ];

    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            StatusBit::InvalidCommand => 0,
            StatusBit::ResetWatchdog => 1,
            StatusBit::InvalidData => 2,
            StatusBit::InvalidChannel => 3,
            StatusBit::EepromError => 4,
            StatusBit::ResetPowerOn => 5,
            StatusBit::ResetBrownOut => 6,
        }
    }

    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self.position()
    }

    /// Error code latched into `last_error` when the bit is raised.
    #[must_use]
    pub const fn error(self) -> Option<ErrorCode> {
        match self {
            StatusBit::InvalidCommand => Some(ErrorCode::InvalidCommand),
            StatusBit::InvalidData => Some(ErrorCode::InvalidData),
            StatusBit::InvalidChannel => Some(ErrorCode::InvalidChannel),
            StatusBit::EepromError => Some(ErrorCode::EepromRead),
            StatusBit::ResetWatchdog | StatusBit::ResetPowerOn | StatusBit::ResetBrownOut => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            StatusBit::InvalidCommand => "invalid-cmd",
            StatusBit::ResetWatchdog => "reset-wdt",
            StatusBit::InvalidData => "invalid-data",
            StatusBit::InvalidChannel => "invalid-channel",
            StatusBit::EepromError => "eeprom-error",
            StatusBit::ResetPowerOn => "reset-power-on",
            StatusBit::ResetBrownOut => "reset-brown-out",
        }
    }
}

impl fmt::Display for StatusBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Causes of a board reset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResetType {
    Watchdog,
    PowerOn,
    BrownOut,
    Manual,
}

impl ResetType {
    pub const ALL: [ResetType; 4] = [
        ResetType::Watchdog,
        ResetType::PowerOn,
        ResetType::BrownOut,
        ResetType::Manual,
    ];

    /// Status bit carrying the reset cause; manual resets are latched outside the word.
    #[must_use]
    pub const fn status_bit(self) -> Option<StatusBit> {
        match self {
            ResetType::Watchdog => Some(StatusBit::ResetWatchdog),
            ResetType::PowerOn => Some(StatusBit::ResetPowerOn),
            ResetType::BrownOut => Some(StatusBit::ResetBrownOut),
            ResetType::Manual => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            ResetType::Watchdog => 0,
            ResetType::PowerOn => 1,
            ResetType::BrownOut => 2,
            ResetType::Manual => 3,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ResetType::Watchdog => "wdt",
            ResetType::PowerOn => "power-on",
            ResetType::BrownOut => "brown-out",
            ResetType::Manual => "manual",
        }
    }
}

impl fmt::Display for ResetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error codes reported by `GET_LAST_ERROR`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ErrorCode {
    #[default]
    None,
    InvalidCommand,
    InvalidData,
    InvalidChannel,
    InactiveChannel,
    InvalidCrc,
    Reset,
    Adc,
    EepromRead,
    InternalSpi,
    /// Code outside the documented table.
    Custom(u8),
}

impl ErrorCode {
    const NONE_CODE: u8 = 0x00;
    const INVALID_CMD_CODE: u8 = 0x01;
    const INVALID_DATA_CODE: u8 = 0x02;
    const INVALID_CHANNEL_CODE: u8 = 0x03;
    const INACTIVE_CHANNEL_CODE: u8 = 0x04;
    const INVALID_CRC_CODE: u8 = 0x10;
    const RESET_CODE: u8 = 0x13;
    const ADC_CODE: u8 = 0x14;
    const EEPROM_READ_CODE: u8 = 0x20;
    const INTERNAL_SPI_CODE: u8 = 0x30;

    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            ErrorCode::None => Self::NONE_CODE,
            ErrorCode::InvalidCommand => Self::INVALID_CMD_CODE,
            ErrorCode::InvalidData => Self::INVALID_DATA_CODE,
            ErrorCode::InvalidChannel => Self::INVALID_CHANNEL_CODE,
            ErrorCode::InactiveChannel => Self::INACTIVE_CHANNEL_CODE,
            ErrorCode::InvalidCrc => Self::INVALID_CRC_CODE,
            ErrorCode::Reset => Self::RESET_CODE,
            ErrorCode::Adc => Self::ADC_CODE,
            ErrorCode::EepromRead => Self::EEPROM_READ_CODE,
            ErrorCode::InternalSpi => Self::INTERNAL_SPI_CODE,
            ErrorCode::Custom(code) => code,
        }
    }

    #[must_use]
    pub const fn from_raw(code: u8) -> Self {
        match code {
            Self::NONE_CODE => ErrorCode::None,
            Self::INVALID_CMD_CODE => ErrorCode::InvalidCommand,
            Self::INVALID_DATA_CODE => ErrorCode::InvalidData,
            Self::INVALID_CHANNEL_CODE => ErrorCode::InvalidChannel,
            Self::INACTIVE_CHANNEL_CODE => ErrorCode::InactiveChannel,
            Self::INVALID_CRC_CODE => ErrorCode::InvalidCrc,
            Self::RESET_CODE => ErrorCode::Reset,
            Self::ADC_CODE => ErrorCode::Adc,
            Self::EEPROM_READ_CODE => ErrorCode::EepromRead,
            Self::INTERNAL_SPI_CODE => ErrorCode::InternalSpi,
            other => ErrorCode::Custom(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::None => f.write_str("none"),
            ErrorCode::InvalidCommand => f.write_str("invalid-cmd"),
            ErrorCode::InvalidData => f.write_str("invalid-data"),
            ErrorCode::InvalidChannel => f.write_str("invalid-channel"),
            ErrorCode::InactiveChannel => f.write_str("inactive-channel"),
            ErrorCode::InvalidCrc => f.write_str("invalid-crc"),
            ErrorCode::Reset => f.write_str("reset"),
            ErrorCode::Adc => f.write_str("adc"),
            ErrorCode::EepromRead => f.write_str("eeprom-read"),
            ErrorCode::InternalSpi => f.write_str("internal-spi"),
            ErrorCode::Custom(code) => write!(f, "custom(0x{code:02x})"),
        }
    }
}

/// Board status word with reset counters and the most recent error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Status {
    bits: u16,
    manual_reset: bool,
    reset_counts: [u8; 4],
    last_error: ErrorCode,
}

impl Status {
    #[must_use]
    pub const fn new() -> Self {
        Self::from_bits(0)
    }

    /// Builds a status with a preset word; counters and error start cleared.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            bits,
            manual_reset: false,
            reset_counts: [0; 4],
            last_error: ErrorCode::None,
        }
    }

    #[must_use]
    pub const fn checksum(&self) -> u16 {
        CHECKSUM
    }

    #[must_use]
    pub const fn bits(&self) -> u16 {
        self.bits
    }

    /// Overwrites the raw status word without touching counters or `last_error`.
    pub fn set_bits(&mut self, bits: u16) {
        self.bits = bits;
    }

    #[must_use]
    pub const fn is_set(&self, bit: StatusBit) -> bool {
        self.bits & bit.mask() != 0
    }

    /// Sets or clears a status bit. Raising an error bit also updates `last_error`.
    pub fn set(&mut self, bit: StatusBit, state: bool) {
        if state {
            self.bits |= bit.mask();
            if let Some(error) = bit.error() {
                self.last_error = error;
            }
        } else {
            self.bits &= !bit.mask();
        }
    }

    pub fn clear(&mut self, bit: StatusBit) {
        self.set(bit, false);
    }

    /// Clears the whole status word. Counters, the manual latch and `last_error` survive.
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    #[must_use]
    pub const fn is_reset_set(&self, reset: ResetType) -> bool {
        match reset.status_bit() {
            Some(bit) => self.is_set(bit),
            None => self.manual_reset,
        }
    }

    /// Records a reset of the given type and bumps its counter.
    ///
    /// Passive causes (watchdog, power-on, brown-out) are mutually exclusive and
    /// set `last_error` to [`ErrorCode::Reset`]. Manual resets only latch their
    /// own flag.
    pub fn set_reset(&mut self, reset: ResetType) {
        match reset.status_bit() {
            Some(bit) => {
                for other in ResetType::ALL {
                    if let Some(other_bit) = other.status_bit() {
                        self.bits &= !other_bit.mask();
                    }
                }
                self.bits |= bit.mask();
                self.last_error = ErrorCode::Reset;
            }
            None => self.manual_reset = true,
        }

        let count = &mut self.reset_counts[reset.index()];
        *count = count.wrapping_add(1);
    }

    pub fn clear_reset(&mut self, reset: ResetType) {
        match reset.status_bit() {
            Some(bit) => self.bits &= !bit.mask(),
            None => self.manual_reset = false,
        }
    }

    /// Clears every reset flag including the manual latch. Counters are kept.
    pub fn clear_resets(&mut self) {
        for reset in ResetType::ALL {
            self.clear_reset(reset);
        }
    }

    #[must_use]
    pub const fn reset_count(&self, reset: ResetType) -> u8 {
        self.reset_counts[reset.index()]
    }

    #[must_use]
    pub const fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn set_last_error(&mut self, error: ErrorCode) {
        self.last_error = error;
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
