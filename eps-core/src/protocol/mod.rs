//! Command opcodes and their static framing tables.
//!
//! Each [`Opcode`] knows how many parameter bytes it consumes, how wide its
//! response is, and which inclusive parameter ranges it accepts. The
//! dispatcher consults these tables before running any handler.

pub mod codec;

use core::fmt;

pub use codec::{
    ByteSwap, Frame, MAX_FRAME_LEN, Response, ResponseWidth, decode_param, encode_frame,
    encode_response, response_value,
};

/// Fixed response written in place of a reply when a command is rejected.
pub const RESPONSE_ERROR: u16 = 0xffff;

/// Smallest frame accepted by the dispatcher: opcode plus one parameter byte.
pub const MIN_FRAME_LEN: usize = 2;

/// Number of switched outputs addressable by single-switch commands.
pub const SWITCH_COUNT: u8 = 10;

/// Inclusive parameter range accepted by an opcode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParamRange {
    pub min: u8,
    pub max: u8,
}

impl ParamRange {
    #[must_use]
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(self, param: u32) -> bool {
        param >= self.min as u32 && param <= self.max as u32
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}..=0x{:02x}", self.min, self.max)
    }
}

const SWITCH_RANGE: ParamRange = ParamRange::new(1, SWITCH_COUNT);

/// Board command set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
    GetBoardStatus,
    GetLastError,
    GetVersion,
    GetChecksum,
    GetTelemetry,
    GetWdtPeriod,
    SetWdtPeriod,
    ResetWdt,
    GetNumBrownOutResets,
    GetNumAutoSwResets,
    GetNumManualResets,
    GetNumWdtResets,
    SetPdmAllOn,
    SetPdmAllOff,
    GetPdmAllActualState,
    GetPdmAllExpectedState,
    GetPdmAllInitialState,
    SetPdmAllInitialState,
    SetPdmOn,
    SetPdmOff,
    SetPdmInitialStateOn,
    SetPdmInitialStateOff,
    GetPdmActualState,
    SetPdmTimerLimit,
    GetPdmTimerLimit,
    GetPdmTimerValue,
    SetPcmReset,
    ResetNode,
}

impl Opcode {
    pub const ALL: [Opcode; 28] = [
        Opcode::GetBoardStatus,
        Opcode::GetLastError,
        Opcode::GetVersion,
        Opcode::GetChecksum,
        Opcode::GetTelemetry,
        Opcode::GetWdtPeriod,
        Opcode::SetWdtPeriod,
        Opcode::ResetWdt,
        Opcode::GetNumBrownOutResets,
        Opcode::GetNumAutoSwResets,
        Opcode::GetNumManualResets,
        Opcode::GetNumWdtResets,
        Opcode::SetPdmAllOn,
        Opcode::SetPdmAllOff,
        Opcode::GetPdmAllActualState,
        Opcode::GetPdmAllExpectedState,
        Opcode::GetPdmAllInitialState,
        Opcode::SetPdmAllInitialState,
        Opcode::SetPdmOn,
        Opcode::SetPdmOff,
        Opcode::SetPdmInitialStateOn,
        Opcode::SetPdmInitialStateOff,
        Opcode::GetPdmActualState,
        Opcode::SetPdmTimerLimit,
        Opcode::GetPdmTimerLimit,
        Opcode::GetPdmTimerValue,
        Opcode::SetPcmReset,
        Opcode::ResetNode,
    ];

    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            Opcode::GetBoardStatus => 0x01,
            Opcode::GetLastError => 0x03,
            Opcode::GetVersion => 0x04,
            Opcode::GetChecksum => 0x05,
            Opcode::GetTelemetry => 0x10,
            Opcode::GetWdtPeriod => 0x20,
            Opcode::SetWdtPeriod => 0x21,
            Opcode::ResetWdt => 0x22,
            Opcode::GetNumBrownOutResets => 0x31,
            Opcode::GetNumAutoSwResets => 0x32,
            Opcode::GetNumManualResets => 0x33,
            Opcode::GetNumWdtResets => 0x34,
            Opcode::SetPdmAllOn => 0x40,
            Opcode::SetPdmAllOff => 0x41,
            Opcode::GetPdmAllActualState => 0x42,
            Opcode::GetPdmAllExpectedState => 0x43,
            Opcode::GetPdmAllInitialState => 0x44,
            Opcode::SetPdmAllInitialState => 0x45,
            Opcode::SetPdmOn => 0x50,
            Opcode::SetPdmOff => 0x51,
            Opcode::SetPdmInitialStateOn => 0x52,
            Opcode::SetPdmInitialStateOff => 0x53,
            Opcode::GetPdmActualState => 0x54,
            Opcode::SetPdmTimerLimit => 0x60,
            Opcode::GetPdmTimerLimit => 0x61,
            Opcode::GetPdmTimerValue => 0x62,
            Opcode::SetPcmReset => 0x70,
            Opcode::ResetNode => 0x80,
        }
    }

    /// Decodes a raw opcode byte; unknown bytes yield `None`.
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|opcode| opcode.to_raw() == raw)
    }

    /// Canonical console name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::GetBoardStatus => "get-board-status",
            Opcode::GetLastError => "get-last-error",
            Opcode::GetVersion => "get-version",
            Opcode::GetChecksum => "get-checksum",
            Opcode::GetTelemetry => "get-telemetry",
            Opcode::GetWdtPeriod => "get-wdt-period",
            Opcode::SetWdtPeriod => "set-wdt-period",
            Opcode::ResetWdt => "reset-wdt",
            Opcode::GetNumBrownOutResets => "get-num-brown-out-resets",
            Opcode::GetNumAutoSwResets => "get-num-auto-sw-resets",
            Opcode::GetNumManualResets => "get-num-manual-resets",
            Opcode::GetNumWdtResets => "get-num-wdt-resets",
            Opcode::SetPdmAllOn => "set-pdm-all-on",
            Opcode::SetPdmAllOff => "set-pdm-all-off",
            Opcode::GetPdmAllActualState => "get-pdm-all-actual-state",
            Opcode::GetPdmAllExpectedState => "get-pdm-all-expected-state",
            Opcode::GetPdmAllInitialState => "get-pdm-all-initial-state",
            Opcode::SetPdmAllInitialState => "set-pdm-all-initial-state",
            Opcode::SetPdmOn => "set-pdm-on",
            Opcode::SetPdmOff => "set-pdm-off",
            Opcode::SetPdmInitialStateOn => "set-pdm-initial-state-on",
            Opcode::SetPdmInitialStateOff => "set-pdm-initial-state-off",
            Opcode::GetPdmActualState => "get-pdm-actual-state",
            Opcode::SetPdmTimerLimit => "set-pdm-timer-limit",
            Opcode::GetPdmTimerLimit => "get-pdm-timer-limit",
            Opcode::GetPdmTimerValue => "get-pdm-timer-value",
            Opcode::SetPcmReset => "set-pcm-reset",
            Opcode::ResetNode => "reset-node",
        }
    }

    /// Finds an opcode by console name. Matching ignores ASCII case and
    /// treats `_` like `-`, so `GET_VERSION` resolves as well.
    #[must_use]
    pub fn find(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|opcode| {
            let canonical = opcode.name();
            canonical.len() == name.len()
                && canonical
                    .bytes()
                    .zip(name.bytes())
                    .all(|(lhs, rhs)| lhs == normalize(rhs))
        })
    }

    /// Number of parameter bytes carried after the opcode.
    #[must_use]
    pub const fn param_len(self) -> usize {
        match self {
            Opcode::GetTelemetry | Opcode::SetPdmTimerLimit => 2,
            _ => 1,
        }
    }

    /// Encodes this command with `param` at the opcode's parameter width.
    #[must_use]
    pub fn frame(self, param: u32, swap: bool) -> Frame {
        encode_frame(self.to_raw(), param, self.param_len(), swap)
    }

    /// Response width, widened for responses that merge a daughterboard value.
    #[must_use]
    pub const fn response_width(self, daughterboard: bool) -> ResponseWidth {
        match self {
            Opcode::GetBoardStatus
            | Opcode::GetLastError
            | Opcode::GetVersion
            | Opcode::GetChecksum
            | Opcode::GetNumBrownOutResets
            | Opcode::GetNumAutoSwResets
            | Opcode::GetNumManualResets
            | Opcode::GetNumWdtResets => {
                if daughterboard {
                    ResponseWidth::Long
                } else {
                    ResponseWidth::Word
                }
            }
            Opcode::GetTelemetry
            | Opcode::GetWdtPeriod
            | Opcode::GetPdmActualState
            | Opcode::GetPdmTimerLimit
            | Opcode::GetPdmTimerValue => ResponseWidth::Word,
            Opcode::GetPdmAllActualState
            | Opcode::GetPdmAllExpectedState
            | Opcode::GetPdmAllInitialState => ResponseWidth::Long,
            Opcode::SetWdtPeriod
            | Opcode::ResetWdt
            | Opcode::SetPdmAllOn
            | Opcode::SetPdmAllOff
            | Opcode::SetPdmAllInitialState
            | Opcode::SetPdmOn
            | Opcode::SetPdmOff
            | Opcode::SetPdmInitialStateOn
            | Opcode::SetPdmInitialStateOff
            | Opcode::SetPdmTimerLimit
            | Opcode::SetPcmReset
            | Opcode::ResetNode => ResponseWidth::Empty,
        }
    }

    /// Width of the error sentinel: 32-bit replies keep their width, all
    /// others fall back to a single word.
    #[must_use]
    pub const fn error_width(self, daughterboard: bool) -> ResponseWidth {
        match self.response_width(daughterboard) {
            ResponseWidth::Long => ResponseWidth::Long,
            ResponseWidth::Empty | ResponseWidth::Word => ResponseWidth::Word,
        }
    }

    /// Accepted command data range, if the opcode restricts it.
    #[must_use]
    pub const fn data_range(self) -> Option<ParamRange> {
        match self {
            Opcode::SetWdtPeriod => Some(ParamRange::new(0x01, 0x5a)),
            Opcode::SetPcmReset => Some(ParamRange::new(0x01, 0x0f)),
            _ => None,
        }
    }

    /// Accepted switch-number range, if the opcode addresses one switch.
    #[must_use]
    pub const fn channel_range(self) -> Option<ParamRange> {
        match self {
            Opcode::SetPdmOn
            | Opcode::SetPdmOff
            | Opcode::SetPdmInitialStateOn
            | Opcode::SetPdmInitialStateOff
            | Opcode::GetPdmActualState
            | Opcode::GetPdmTimerLimit
            | Opcode::GetPdmTimerValue => Some(SWITCH_RANGE),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const fn normalize(byte: u8) -> u8 {
    match byte {
        b'_' => b'-',
        other => other.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_round_trip() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_raw(opcode.to_raw()), Some(opcode));
        }
        assert_eq!(Opcode::from_raw(0xff), None);
        assert_eq!(Opcode::from_raw(0x02), None);
    }

    #[test]
    fn finds_names_in_either_spelling() {
        assert_eq!(Opcode::find("get-version"), Some(Opcode::GetVersion));
        assert_eq!(Opcode::find("GET_VERSION"), Some(Opcode::GetVersion));
        assert_eq!(Opcode::find("get-versio"), None);
    }

    #[test]
    fn two_byte_parameters() {
        let wide: heapless::Vec<Opcode, 4> = Opcode::ALL
            .into_iter()
            .filter(|opcode| opcode.param_len() == 2)
            .collect();
        assert_eq!(
            wide.as_slice(),
            [Opcode::GetTelemetry, Opcode::SetPdmTimerLimit]
        );
    }

    #[test]
    fn daughterboard_widens_board_responses() {
        assert_eq!(
            Opcode::GetVersion.response_width(false),
            ResponseWidth::Word
        );
        assert_eq!(Opcode::GetVersion.response_width(true), ResponseWidth::Long);
        assert_eq!(
            Opcode::GetTelemetry.response_width(true),
            ResponseWidth::Word
        );
        assert_eq!(Opcode::SetPdmOn.error_width(true), ResponseWidth::Word);
        assert_eq!(
            Opcode::GetPdmAllActualState.error_width(false),
            ResponseWidth::Long
        );
    }

    #[test]
    fn ranges_are_inclusive() {
        let range = Opcode::SetWdtPeriod.data_range().expect("watchdog range");
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(range.contains(90));
        assert!(!range.contains(91));
        assert!(Opcode::SetPdmTimerLimit.channel_range().is_none());
    }
}
