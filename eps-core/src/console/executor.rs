//! Console command dispatcher.
//!
//! [`ConsoleExecutor`] owns the board and turns parsed console commands into
//! protocol traffic, time steps and operator edits. Results come back as
//! [`ConsoleOutcome`] values so each host can render them its own way.

use core::fmt;

use crate::SimTime;
use crate::channel::{ChannelCode, ChannelTelemetry};
use crate::eps::{ChannelError, Eps, NUM_SWITCHES, SwitchError, Verdict};
use crate::events::EventSink;
use crate::protocol::{Opcode, Response, encode_frame, response_value};

use super::grammar::{
    self, CmdCommand, Command, SwitchAction, SwitchCommand, TickAmount, TlmCommand,
};
use super::status::StatusSnapshot;

/// Simulated time per bare `tick`.
pub const DEFAULT_TICK_MS: SimTime = 100;

/// Response bytes captured after a write or read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub response: Response,
    /// Validation result, `None` for plain reads or frames the board dropped.
    pub verdict: Option<Verdict>,
    swap: bool,
}

impl Exchange {
    fn capture<S: EventSink>(eps: &Eps<S>, verdict: Option<Verdict>) -> Self {
        Self {
            response: Response::from_slice(eps.read()).unwrap_or_default(),
            verdict,
            swap: eps.byte_swap().output,
        }
    }

    /// Decoded response value, `None` when the buffer is empty.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        (!self.response.is_empty()).then(|| response_value(&self.response, self.swap))
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value(), self.response.len()) {
            (None, _) => f.write_str("NO RESPONSE"),
            (Some(value), 2) => write!(f, "0x{value:04x}"),
            (Some(value), _) => write!(f, "0x{value:08x}"),
        }
    }
}

/// Successful console results.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleOutcome<'a> {
    /// A frame was written (`cmd`, `write`) or the buffer re-read (`read`).
    Exchange(Exchange),
    Advanced { time_ms: SimTime },
    Time { time_ms: SimTime },
    /// `tlm` with no channel; the host walks [`Eps::telemetry_iter`].
    TelemetryList,
    Telemetry {
        code: ChannelCode,
        reading: ChannelTelemetry,
    },
    TelemetrySet {
        code: ChannelCode,
        value: f64,
    },
    Switch(SwitchCommand),
    Status(StatusSnapshot),
    Help(Option<&'a str>),
}

/// Errors surfaced while executing a console line.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleError<'a> {
    Parse(grammar::ParseError<'a>),
    Channel(ChannelError),
    Switch(SwitchError),
    /// Switch numbers are one-based.
    SwitchNumber(u8),
}

impl fmt::Display for ConsoleError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Parse(err) => err.fmt(f),
            ConsoleError::Channel(err) => err.fmt(f),
            ConsoleError::Switch(err) => err.fmt(f),
            ConsoleError::SwitchNumber(number) => {
                write!(f, "switch {number} out of range 1-{NUM_SWITCHES}")
            }
        }
    }
}

impl<'a> From<grammar::ParseError<'a>> for ConsoleError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl From<ChannelError> for ConsoleError<'_> {
    fn from(error: ChannelError) -> Self {
        Self::Channel(error)
    }
}

impl From<SwitchError> for ConsoleError<'_> {
    fn from(error: SwitchError) -> Self {
        Self::Switch(error)
    }
}

/// Drives an [`Eps`] from console lines.
pub struct ConsoleExecutor<S: EventSink> {
    eps: Eps<S>,
    tick_ms: SimTime,
}

impl<S: EventSink> ConsoleExecutor<S> {
    #[must_use]
    pub const fn new(eps: Eps<S>) -> Self {
        Self {
            eps,
            tick_ms: DEFAULT_TICK_MS,
        }
    }

    /// Sets the time covered by one bare tick.
    #[must_use]
    pub const fn with_tick(mut self, tick_ms: SimTime) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    #[must_use]
    pub const fn tick_ms(&self) -> SimTime {
        self.tick_ms
    }

    #[must_use]
    pub const fn eps(&self) -> &Eps<S> {
        &self.eps
    }

    pub fn eps_mut(&mut self) -> &mut Eps<S> {
        &mut self.eps
    }

    #[must_use]
    pub fn into_inner(self) -> Eps<S> {
        self.eps
    }

    /// Parses and executes one console line.
    pub fn execute<'a>(&mut self, line: &'a str) -> Result<ConsoleOutcome<'a>, ConsoleError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    fn dispatch<'a>(&mut self, command: Command<'a>) -> Result<ConsoleOutcome<'a>, ConsoleError<'a>> {
        let outcome = match command {
            Command::Cmd(cmd) => ConsoleOutcome::Exchange(self.send(cmd)),
            Command::Write(frame) => {
                let verdict = self.eps.write(&frame);
                ConsoleOutcome::Exchange(Exchange::capture(&self.eps, verdict))
            }
            Command::Read => ConsoleOutcome::Exchange(Exchange::capture(&self.eps, None)),
            Command::Tick(amount) => {
                self.eps.advance(self.tick_span(amount));
                ConsoleOutcome::Advanced {
                    time_ms: self.eps.time(),
                }
            }
            Command::Time => ConsoleOutcome::Time {
                time_ms: self.eps.time(),
            },
            Command::Tlm(tlm) => self.telemetry(tlm)?,
            Command::Switch(switch) => {
                self.switch(switch)?;
                ConsoleOutcome::Switch(switch)
            }
            Command::Status => ConsoleOutcome::Status(StatusSnapshot::capture(&self.eps)),
            Command::Help(help) => ConsoleOutcome::Help(help.topic),
        };
        Ok(outcome)
    }

    fn send(&mut self, cmd: CmdCommand) -> Exchange {
        let width = Opcode::from_raw(cmd.opcode).map_or(1, Opcode::param_len);
        let frame = encode_frame(
            cmd.opcode,
            cmd.param.unwrap_or_default(),
            width,
            self.eps.byte_swap().input,
        );
        let verdict = self.eps.write(&frame);
        Exchange::capture(&self.eps, verdict)
    }

    fn tick_span(&self, amount: Option<TickAmount>) -> SimTime {
        match amount {
            None => self.tick_ms,
            Some(TickAmount::Duration(duration)) => {
                SimTime::try_from(duration.as_millis()).unwrap_or(SimTime::MAX)
            }
            Some(TickAmount::Ticks(ticks)) => self.tick_ms.saturating_mul(SimTime::from(ticks)),
        }
    }

    fn telemetry<'a>(&mut self, tlm: TlmCommand) -> Result<ConsoleOutcome<'a>, ConsoleError<'a>> {
        let Some(code) = tlm.channel else {
            return Ok(ConsoleOutcome::TelemetryList);
        };
        match tlm.value {
            Some(value) => {
                self.eps.set_telemetry(code, value)?;
                Ok(ConsoleOutcome::TelemetrySet { code, value })
            }
            None => Ok(ConsoleOutcome::Telemetry {
                code,
                reading: self.eps.telemetry(code)?,
            }),
        }
    }

    fn switch<'a>(&mut self, switch: SwitchCommand) -> Result<(), ConsoleError<'a>> {
        let index = usize::from(switch.number)
            .checked_sub(1)
            .filter(|index| *index < NUM_SWITCHES)
            .ok_or(ConsoleError::SwitchNumber(switch.number))?;
        match switch.action {
            SwitchAction::On => self.eps.set_switch_state(index, true)?,
            SwitchAction::Off => self.eps.set_switch_state(index, false)?,
            SwitchAction::InitialOn => self.eps.set_switch_initial_state(index, true)?,
            SwitchAction::InitialOff => self.eps.set_switch_initial_state(index, false)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eps::EpsConfig;
    use crate::protocol::ByteSwap;
    use heapless::String;

    fn executor() -> ConsoleExecutor<crate::events::NoopEventSink> {
        ConsoleExecutor::new(Eps::new(EpsConfig::default()))
    }

    fn exchange(outcome: ConsoleOutcome<'_>) -> Exchange {
        match outcome {
            ConsoleOutcome::Exchange(exchange) => exchange,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    fn text(exchange: &Exchange) -> String<16> {
        let mut out = String::new();
        fmt::write(&mut out, format_args!("{exchange}")).expect("fits");
        out
    }

    #[test]
    fn cmd_by_name_reads_checksum() {
        let mut console = executor();
        let result = exchange(console.execute("cmd get-checksum").expect("runs"));
        assert_eq!(result.value(), Some(0xdead));
        assert_eq!(text(&result).as_str(), "0xdead");
        assert!(result.verdict.is_some_and(Verdict::is_valid));
    }

    #[test]
    fn cmd_reports_sentinel_for_bad_switch() {
        let mut console = executor();
        let result = exchange(console.execute("cmd set-pdm-on 11").expect("runs"));
        assert_eq!(text(&result).as_str(), "0xffff");
        assert!(result.verdict.is_some_and(|verdict| verdict.invalid_channel));
    }

    #[test]
    fn telemetry_parameter_spans_two_bytes() {
        let mut console = executor();
        console.execute("tlm 0xe308 12").expect("set");
        let result = exchange(console.execute("cmd get-telemetry 0xe308").expect("runs"));
        assert_eq!(result.value(), Some(12));
    }

    #[test]
    fn swapped_board_still_decodes_console_commands() {
        let config = EpsConfig {
            swap: ByteSwap::new(true, true),
            ..EpsConfig::default()
        };
        let mut console = ConsoleExecutor::new(Eps::new(config));
        console.execute("tlm TBRD 7").expect("set");
        let result = exchange(console.execute("cmd get-telemetry 0xe308").expect("runs"));
        assert_eq!(result.value(), Some(7));
        assert_eq!(result.response.as_slice(), [0x07, 0x00]);
    }

    #[test]
    fn read_without_write_has_no_response() {
        let mut console = executor();
        let result = exchange(console.execute("read").expect("runs"));
        assert_eq!(text(&result).as_str(), "NO RESPONSE");
        assert_eq!(result.verdict, None);
    }

    #[test]
    fn raw_write_then_read() {
        let mut console = executor();
        exchange(console.execute("write 0x04 0x00").expect("runs"));
        let again = exchange(console.execute("read").expect("runs"));
        assert_eq!(text(&again).as_str(), "0x0000");
    }

    #[test]
    fn tick_forms_advance_time() {
        let mut console = executor().with_tick(250);
        console.execute("tick").expect("tick");
        console.execute("tick 4").expect("ticks");
        match console.execute("tick 1s").expect("duration") {
            ConsoleOutcome::Advanced { time_ms } => assert_eq!(time_ms, 2_250),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn switch_numbers_are_one_based() {
        let mut console = executor();
        console.execute("switch 1 on").expect("switch 1");
        assert_eq!(console.eps().switch_state(0), Ok(true));
        match console.execute("switch 0 on") {
            Err(ConsoleError::SwitchNumber(0)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match console.execute("switch 11 initial-on") {
            Err(ConsoleError::SwitchNumber(11)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_numeric_channel_is_an_error() {
        let mut console = executor();
        match console.execute("tlm 0x1234") {
            Err(ConsoleError::Channel(ChannelError::UnknownChannel(code))) => {
                assert_eq!(code, ChannelCode::new(0x1234));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
