//! Board snapshot surfaced by the console `status` command.
//!
//! [`StatusSnapshot`] copies everything worth showing out of an [`Eps`] so the
//! host can render it after the board has moved on. [`StatusFormatter`] keeps
//! the textual rendering identical across front-ends.

use core::fmt;

use crate::SimTime;
use crate::eps::{Eps, NUM_SWITCHES};
use crate::events::EventSink;
use crate::status::{ErrorCode, ResetType, StatusBit};
use crate::version::Version;

/// Sampled state for a single PDM switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwitchSnapshot {
    pub state: bool,
    pub commanded: bool,
    pub initial: bool,
    pub timer_limit: u8,
    pub timer_value: u8,
}

/// Point-in-time copy of the board state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub time_ms: SimTime,
    pub in_reset: bool,
    pub pcm_state: u8,
    pub wdt_elapsed_ms: SimTime,
    pub wdt_timeout_ms: SimTime,
    pub version: Version,
    pub daughterboard: Option<Version>,
    pub status_bits: u16,
    pub last_error: ErrorCode,
    /// Counters in [`ResetType::ALL`] order.
    pub reset_counts: [u8; 4],
    pub switches: [SwitchSnapshot; NUM_SWITCHES],
}

impl StatusSnapshot {
    /// Captures the current state of `eps`.
    #[must_use]
    pub fn capture<S: EventSink>(eps: &Eps<S>) -> Self {
        let status = eps.status();
        let mut switches = [SwitchSnapshot::default(); NUM_SWITCHES];
        for (index, slot) in switches.iter_mut().enumerate() {
            if let Ok(switch) = eps.switch(index) {
                *slot = SwitchSnapshot {
                    state: switch.state(),
                    commanded: switch.commanded_state(),
                    initial: switch.initial_state(),
                    timer_limit: switch.timer_limit(),
                    timer_value: switch.timer_value(),
                };
            }
        }

        Self {
            time_ms: eps.time(),
            in_reset: eps.is_reset(),
            pcm_state: eps.pcm_state(),
            wdt_elapsed_ms: eps.wdt_elapsed(),
            wdt_timeout_ms: eps.wdt_timeout(),
            version: eps.version(),
            daughterboard: eps
                .has_daughterboard()
                .then(|| eps.daughterboard_version()),
            status_bits: status.bits(),
            last_error: status.last_error(),
            reset_counts: ResetType::ALL.map(|reset| status.reset_count(reset)),
            switches,
        }
    }
}

/// Renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the clock line (e.g. `time 1500ms reset=no pcm=0x0f wdt=1500/240000ms`).
    pub fn write_time_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let snapshot = self.snapshot;
        write!(
            writer,
            "time {}ms reset={} pcm=0x{:02x} wdt={}/{}ms",
            snapshot.time_ms,
            yes_no(snapshot.in_reset),
            snapshot.pcm_state,
            snapshot.wdt_elapsed_ms,
            snapshot.wdt_timeout_ms,
        )
    }

    /// Writes the version line (e.g. `version 2748.1 daughterboard=none`).
    pub fn write_version_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "version {} daughterboard=", self.snapshot.version)?;
        match self.snapshot.daughterboard {
            Some(version) => write!(writer, "{version}"),
            None => writer.write_str("none"),
        }
    }

    /// Writes the status word line (e.g. `status 0x0001 invalid-cmd last-error=invalid-cmd`).
    pub fn write_status_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let bits = self.snapshot.status_bits;
        write!(writer, "status 0x{bits:04x}")?;
        for bit in StatusBit::ALL {
            if bits & bit.mask() != 0 {
                write!(writer, " {bit}")?;
            }
        }
        write!(writer, " last-error={}", self.snapshot.last_error)
    }

    /// Writes the reset counter line (e.g. `resets wdt=1 power-on=0 brown-out=0 manual=2`).
    pub fn write_resets_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("resets")?;
        for (reset, count) in ResetType::ALL.iter().zip(self.snapshot.reset_counts) {
            write!(writer, " {reset}={count}")?;
        }
        Ok(())
    }

    /// Writes one switch line (e.g. `switch 4 on commanded=on initial=off timer=2/4`).
    ///
    /// `index` is zero-based; the rendered number is one-based.
    pub fn write_switch_line<W: fmt::Write>(&self, writer: &mut W, index: usize) -> fmt::Result {
        let Some(switch) = self.snapshot.switches.get(index) else {
            return Ok(());
        };
        write!(
            writer,
            "switch {} {} commanded={} initial={} timer={}/{}",
            index + 1,
            on_off(switch.state),
            on_off(switch.commanded),
            on_off(switch.initial),
            switch.timer_value,
            switch.timer_limit,
        )
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
