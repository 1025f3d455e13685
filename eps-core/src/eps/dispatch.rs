//! Command dispatcher: frame validation, handlers and status bookkeeping.

use core::fmt;

use crate::bus::{PcmRail, PdmSwitch};
use crate::channel::ChannelCode;
use crate::events::{EpsEvent, EventSink};
use crate::protocol::{
    MIN_FRAME_LEN, Opcode, RESPONSE_ERROR, ResponseWidth, SWITCH_COUNT, decode_param,
    encode_response,
};
use crate::status::{ResetType, Status, StatusBit};

use super::{BCR_BUS, Eps, NUM_SWITCHES, pcm_bus, pdm_bus};

const MS_PER_MINUTE: u64 = 60_000;

/// Validation result for a single command, mirrored into the status word.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Verdict {
    pub invalid_command: bool,
    pub invalid_data: bool,
    pub invalid_channel: bool,
}

impl Verdict {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !(self.invalid_command || self.invalid_data || self.invalid_channel)
    }

    fn apply(self, status: &mut Status) {
        status.set(StatusBit::InvalidCommand, self.invalid_command);
        status.set(StatusBit::InvalidData, self.invalid_data);
        status.set(StatusBit::InvalidChannel, self.invalid_channel);
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("ok");
        }
        let flags = [
            (self.invalid_command, StatusBit::InvalidCommand),
            (self.invalid_data, StatusBit::InvalidData),
            (self.invalid_channel, StatusBit::InvalidChannel),
        ];
        let mut first = true;
        for (set, bit) in flags {
            if set {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(bit.name())?;
                first = false;
            }
        }
        Ok(())
    }
}

// Handler failure discovered after range validation.
enum Fault {
    InvalidChannel,
}

impl<S: EventSink> Eps<S> {
    /// Delivers a command frame to the board.
    ///
    /// While the board is in reset the frame is dropped and the response
    /// buffer is left empty. Frames shorter than [`MIN_FRAME_LEN`] produce the
    /// error sentinel without touching the status word. Everything else is
    /// validated, executed and mirrored into the status bits. Returns the
    /// verdict, or `None` when the frame never reached validation.
    pub fn write(&mut self, frame: &[u8]) -> Option<Verdict> {
        self.response.clear();
        if self.is_reset() {
            return None;
        }
        if frame.len() < MIN_FRAME_LEN {
            self.emit(EpsEvent::MalformedFrame { len: frame.len() });
            self.response = encode_response(
                u32::from(RESPONSE_ERROR),
                ResponseWidth::Word,
                self.swap.output,
            );
            return None;
        }

        let raw = frame[0];
        let args = &frame[1..];
        let Some(opcode) = Opcode::from_raw(raw) else {
            let param = decode_param(args, 1, self.swap.input);
            self.emit(EpsEvent::CommandReceived { opcode: raw, param });
            self.emit(EpsEvent::UnknownOpcode(raw));
            let verdict = Verdict {
                invalid_command: true,
                ..Verdict::default()
            };
            self.finish(verdict, ResponseWidth::Word);
            return Some(verdict);
        };

        let param = decode_param(args, opcode.param_len(), self.swap.input);
        self.emit(EpsEvent::CommandReceived { opcode: raw, param });

        let mut verdict = Verdict::default();
        if opcode.data_range().is_some_and(|range| !range.contains(param)) {
            self.emit(EpsEvent::DataOutOfRange { opcode, param });
            verdict.invalid_data = true;
        }
        if opcode.channel_range().is_some_and(|range| !range.contains(param)) {
            self.emit(EpsEvent::ChannelOutOfRange { opcode, param });
            verdict.invalid_channel = true;
        }

        if verdict.is_valid() {
            match self.execute(opcode, param) {
                Ok(value) => {
                    let width = opcode.response_width(self.daughterboard);
                    self.response = encode_response(value, width, self.swap.output);
                }
                Err(Fault::InvalidChannel) => verdict.invalid_channel = true,
            }
        }

        self.finish(verdict, opcode.error_width(self.daughterboard));
        Some(verdict)
    }

    /// Buffered response of the last write. Reading never changes state.
    #[must_use]
    pub fn read(&self) -> &[u8] {
        &self.response
    }

    /// Writes `frame` and returns the response it produced.
    pub fn transfer(&mut self, frame: &[u8]) -> &[u8] {
        self.write(frame);
        self.read()
    }

    fn finish(&mut self, verdict: Verdict, error_width: ResponseWidth) {
        verdict.apply(&mut self.status);
        if verdict.is_valid() {
            self.wdt_elapsed_ms = 0;
        } else {
            self.response =
                encode_response(u32::from(RESPONSE_ERROR), error_width, self.swap.output);
        }
    }

    fn execute(&mut self, opcode: Opcode, param: u32) -> Result<u32, Fault> {
        let value = match opcode {
            Opcode::GetBoardStatus => self.widen(Status::bits),
            Opcode::GetLastError => self.widen(|status| u16::from(status.last_error().to_raw())),
            Opcode::GetVersion => {
                let primary = u32::from(self.version.raw());
                if self.daughterboard {
                    (u32::from(self.db_version.raw()) << 16) | primary
                } else {
                    primary
                }
            }
            Opcode::GetChecksum => self.widen(Status::checksum),
            Opcode::GetTelemetry => self.telemetry_count(param)?,
            Opcode::GetWdtPeriod => {
                u32::try_from(self.wdt_timeout_ms / MS_PER_MINUTE).unwrap_or(u32::MAX)
            }
            Opcode::SetWdtPeriod => {
                self.wdt_timeout_ms = u64::from(param) * MS_PER_MINUTE;
                0
            }
            Opcode::ResetWdt => {
                self.wdt_elapsed_ms = 0;
                0
            }
            Opcode::GetNumBrownOutResets => self.reset_count(ResetType::BrownOut),
            Opcode::GetNumAutoSwResets => 0,
            Opcode::GetNumManualResets => self.reset_count(ResetType::Manual),
            Opcode::GetNumWdtResets => self.reset_count(ResetType::Watchdog),
            Opcode::SetPdmAllOn | Opcode::SetPdmAllOff => {
                let on = opcode == Opcode::SetPdmAllOn;
                for index in 0..NUM_SWITCHES {
                    self.buses.node_mut(pdm_bus(index)).set_switch_state(on);
                }
                0
            }
            Opcode::GetPdmAllActualState => self.switch_mask(PdmSwitch::state),
            Opcode::GetPdmAllExpectedState => self.switch_mask(PdmSwitch::commanded_state),
            Opcode::GetPdmAllInitialState => self.switch_mask(PdmSwitch::initial_state),
            Opcode::SetPdmAllInitialState => {
                let on = param != 0;
                for index in 0..NUM_SWITCHES {
                    if let Some(switch) = self.switch_mut(index) {
                        switch.set_initial_state(on);
                    }
                }
                0
            }
            Opcode::SetPdmOn | Opcode::SetPdmOff => {
                let index = switch_index(param);
                self.buses
                    .node_mut(pdm_bus(index))
                    .set_switch_state(opcode == Opcode::SetPdmOn);
                0
            }
            Opcode::SetPdmInitialStateOn | Opcode::SetPdmInitialStateOff => {
                let on = opcode == Opcode::SetPdmInitialStateOn;
                if let Some(switch) = self.switch_mut(switch_index(param)) {
                    switch.set_initial_state(on);
                }
                0
            }
            Opcode::GetPdmActualState => self.read_switch(param, |switch| u32::from(switch.state())),
            Opcode::SetPdmTimerLimit => {
                let number = (param >> 8) & 0xff;
                if number == 0 || number > u32::from(SWITCH_COUNT) {
                    self.emit(EpsEvent::ChannelOutOfRange { opcode, param });
                    return Err(Fault::InvalidChannel);
                }
                let [.., limit] = param.to_be_bytes();
                if let Some(switch) = self.switch_mut(switch_index(number)) {
                    switch.set_timer_limit(limit);
                }
                0
            }
            Opcode::GetPdmTimerLimit => {
                self.read_switch(param, |switch| u32::from(switch.timer_limit()))
            }
            Opcode::GetPdmTimerValue => {
                self.read_switch(param, |switch| u32::from(switch.timer_value()))
            }
            Opcode::SetPcmReset => {
                for rail in PcmRail::ALL {
                    if param & u32::from(rail.mask()) != 0 {
                        self.reset_bus(pcm_bus(rail));
                    }
                }
                0
            }
            Opcode::ResetNode => {
                self.status.set_reset(ResetType::Manual);
                self.reset_bus(BCR_BUS);
                self.wdt_elapsed_ms = 0;
                0
            }
        };
        Ok(value)
    }

    // Primary value in the low half, daughterboard value in the high half.
    fn widen(&self, field: impl Fn(&Status) -> u16) -> u32 {
        let primary = u32::from(field(&self.status));
        if self.daughterboard {
            (u32::from(field(&self.db_status)) << 16) | primary
        } else {
            primary
        }
    }

    fn reset_count(&self, reset: ResetType) -> u32 {
        self.widen(|status| u16::from(status.reset_count(reset)))
    }

    fn telemetry_count(&mut self, param: u32) -> Result<u32, Fault> {
        let code = ChannelCode::new(u16::try_from(param & 0xffff).unwrap_or_default());
        match self.registered_channel(code) {
            Some(channel) => Ok(u32::from(channel.sample())),
            None => {
                self.emit(EpsEvent::UnknownChannel(code));
                Err(Fault::InvalidChannel)
            }
        }
    }

    fn switch_mask(&self, bit: impl Fn(&PdmSwitch) -> bool) -> u32 {
        (0..NUM_SWITCHES)
            .filter(|index| self.switch(*index).is_ok_and(&bit))
            .fold(0, |mask, index| mask | (1 << (index + 1)))
    }

    fn read_switch(&self, number: u32, field: impl Fn(&PdmSwitch) -> u32) -> u32 {
        self.switch(switch_index(number)).map_or(0, field)
    }
}

// Converts a validated 1-based switch number into an arena offset.
fn switch_index(number: u32) -> usize {
    usize::try_from(number.saturating_sub(1)).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eps::EpsConfig;

    fn eps() -> Eps {
        Eps::new(EpsConfig::default())
    }

    #[test]
    fn verdict_renders_raised_flags() {
        let verdict = Verdict {
            invalid_command: true,
            invalid_channel: true,
            ..Verdict::default()
        };
        let mut text = heapless::String::<64>::new();
        core::fmt::write(&mut text, format_args!("{verdict}")).expect("fits");
        assert_eq!(text.as_str(), "invalid-cmd,invalid-channel");
    }

    #[test]
    fn short_frame_yields_sentinel_without_status_change() {
        let mut eps = eps();
        assert_eq!(eps.write(&[0x04]), None);
        assert_eq!(eps.read(), [0xff, 0xff]);
        assert_eq!(eps.status().bits(), 0);
    }

    #[test]
    fn unknown_opcode_raises_invalid_command() {
        let mut eps = eps();
        let verdict = eps.write(&[0x02, 0x00]).expect("validated");
        assert!(verdict.invalid_command);
        assert!(eps.status().is_set(StatusBit::InvalidCommand));
        assert_eq!(eps.read(), [0xff, 0xff]);
    }

    #[test]
    fn switch_mask_skips_bit_zero() {
        let mut eps = eps();
        eps.write(&[0x50, 0x01]);
        eps.write(&[0x50, 0x0a]);
        assert_eq!(eps.switch_mask(PdmSwitch::state), 0b100_0000_0010);
    }

    #[test]
    fn timer_limit_rejects_switch_zero() {
        let mut eps = eps();
        let verdict = eps.write(&[0x60, 0x00, 0x04]).expect("validated");
        assert!(verdict.invalid_channel);
        assert_eq!(eps.read(), [0xff, 0xff]);
    }
}
