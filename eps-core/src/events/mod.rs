//! Board event catalog and the sink interface the simulator reports through.
//!
//! The core never logs directly. Every notable transition is described by an
//! [`EpsEvent`] and handed to an [`EventSink`] chosen by the host. Hosts
//! forward events to their logging stack; tests and firmware-style targets can
//! keep them in an [`EventRecorder`] ring instead.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::SimTime;
use crate::channel::ChannelCode;
use crate::protocol::Opcode;

/// Sequential identifier assigned to recorded events. Wraps on overflow.
pub type EventId = u32;

/// Default number of events retained by an [`EventRecorder`].
pub const EVENT_RING_CAPACITY: usize = 64;

/// Severity attached to each event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        })
    }
}

/// Events raised by the board model.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EpsEvent {
    CommandReceived { opcode: u8, param: u32 },
    MalformedFrame { len: usize },
    DataOutOfRange { opcode: Opcode, param: u32 },
    ChannelOutOfRange { opcode: Opcode, param: u32 },
    UnknownOpcode(u8),
    UnknownChannel(ChannelCode),
    TelemetryUpdated { code: ChannelCode, value: f64 },
    ChannelConfigured(ChannelCode),
    SwitchStateUpdated { index: usize, on: bool },
    SwitchInitialStateUpdated { index: usize, on: bool },
    InvalidSwitch(usize),
    SwitchTimerExpired(usize),
    BusResetAsserted(&'static str),
    BusResetReleased(&'static str),
    BusAlreadyReset(&'static str),
    WatchdogExpired,
}

impl EpsEvent {
    #[must_use]
    pub const fn level(&self) -> EventLevel {
        match self {
            EpsEvent::CommandReceived { .. }
            | EpsEvent::TelemetryUpdated { .. }
            | EpsEvent::ChannelConfigured(_)
            | EpsEvent::SwitchStateUpdated { .. }
            | EpsEvent::SwitchInitialStateUpdated { .. }
            | EpsEvent::SwitchTimerExpired(_)
            | EpsEvent::BusResetAsserted(_)
            | EpsEvent::BusResetReleased(_) => EventLevel::Info,
            EpsEvent::BusAlreadyReset(_) | EpsEvent::WatchdogExpired => EventLevel::Warning,
            EpsEvent::MalformedFrame { .. }
            | EpsEvent::DataOutOfRange { .. }
            | EpsEvent::ChannelOutOfRange { .. }
            | EpsEvent::UnknownOpcode(_)
            | EpsEvent::UnknownChannel(_)
            | EpsEvent::InvalidSwitch(_) => EventLevel::Error,
        }
    }
}

impl fmt::Display for EpsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpsEvent::CommandReceived { opcode, param } => match Opcode::from_raw(*opcode) {
                Some(known) => write!(f, "eps cmd {known}: cmd=0x{opcode:02x}, param=0x{param:x}"),
                None => write!(f, "eps cmd unknown: cmd=0x{opcode:02x}, param=0x{param:x}"),
            },
            EpsEvent::MalformedFrame { len } => write!(f, "invalid eps command ({len} bytes)"),
            EpsEvent::DataOutOfRange { opcode, param } => {
                write!(f, "eps cmd {opcode} data out of range: 0x{param:x}")
            }
            EpsEvent::ChannelOutOfRange { opcode, param } => {
                write!(f, "eps cmd {opcode} channel out of range: 0x{param:x}")
            }
            EpsEvent::UnknownOpcode(raw) => write!(f, "unknown eps command 0x{raw:02x}"),
            EpsEvent::UnknownChannel(code) => write!(f, "invalid telemetry channel: {code}"),
            EpsEvent::TelemetryUpdated { code, value } => {
                write!(f, "updating telemetry channel {code} = {value}")
            }
            EpsEvent::ChannelConfigured(code) => write!(f, "configured channel {code}"),
            EpsEvent::SwitchStateUpdated { index, on } => {
                write!(f, "pdm switch {} state: {}", index + 1, on_off(*on))
            }
            EpsEvent::SwitchInitialStateUpdated { index, on } => {
                write!(f, "pdm switch {} initial state: {}", index + 1, on_off(*on))
            }
            EpsEvent::InvalidSwitch(index) => write!(f, "invalid switch number: {}", index + 1),
            EpsEvent::SwitchTimerExpired(index) => {
                write!(f, "pdm switch {} timer expired", index + 1)
            }
            EpsEvent::BusResetAsserted(name) => write!(f, "bus {name} reset enabled"),
            EpsEvent::BusResetReleased(name) => write!(f, "bus {name} reset disabled"),
            EpsEvent::BusAlreadyReset(name) => write!(f, "bus {name} already in reset state"),
            EpsEvent::WatchdogExpired => f.write_str("watchdog timer reset"),
        }
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Observer injected into the board model.
pub trait EventSink {
    fn record(&mut self, time_ms: SimTime, event: EpsEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, time_ms: SimTime, event: EpsEvent) {
        (**self).record(time_ms, event);
    }
}

/// Sink that discards every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&mut self, _time_ms: SimTime, _event: EpsEvent) {}
}

/// Event stored in the recorder ring.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub id: EventId,
    pub time_ms: SimTime,
    pub event: EpsEvent,
}

/// Keeps the newest `CAPACITY` events in a fixed-size ring.
pub struct EventRecorder<const CAPACITY: usize = EVENT_RING_CAPACITY> {
    ring: HistoryBuf<EventRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> EventRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Recorded events in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, EventRecord> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&EventRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Drops every stored record. Identifiers keep counting.
    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// Returns `true` when any retained record satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&EpsEvent) -> bool) -> bool {
        self.ring.oldest_ordered().any(|record| predicate(&record.event))
    }
}

impl<const CAPACITY: usize> Default for EventRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> EventSink for EventRecorder<CAPACITY> {
    fn record(&mut self, time_ms: SimTime, event: EpsEvent) {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(EventRecord { id, time_ms, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_assigns_sequential_ids() {
        let mut recorder = EventRecorder::<4>::new();
        recorder.record(10, EpsEvent::WatchdogExpired);
        recorder.record(20, EpsEvent::BusResetAsserted("BCR_BUS"));

        let latest = recorder.latest().copied().expect("latest record");
        assert_eq!(latest.id, 1);
        assert_eq!(latest.time_ms, 20);
        assert_eq!(latest.event, EpsEvent::BusResetAsserted("BCR_BUS"));
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn recorder_keeps_newest_records() {
        let mut recorder = EventRecorder::<2>::new();
        for index in 0..5 {
            recorder.record(index, EpsEvent::InvalidSwitch(10));
        }

        let times: heapless::Vec<SimTime, 2> =
            recorder.oldest_first().map(|record| record.time_ms).collect();
        assert_eq!(times.as_slice(), [3, 4]);

        recorder.clear();
        assert!(recorder.is_empty());
        recorder.record(9, EpsEvent::WatchdogExpired);
        assert_eq!(recorder.latest().map(|record| record.id), Some(5));
    }

    #[test]
    fn levels_follow_event_kind() {
        assert_eq!(EpsEvent::WatchdogExpired.level(), EventLevel::Warning);
        assert_eq!(EpsEvent::UnknownOpcode(0xff).level(), EventLevel::Error);
        assert_eq!(
            EpsEvent::CommandReceived {
                opcode: 0x01,
                param: 0
            }
            .level(),
            EventLevel::Info
        );
    }

    #[test]
    fn renders_switch_numbers_one_based() {
        let mut text = heapless::String::<64>::new();
        core::fmt::write(&mut text, format_args!("{}", EpsEvent::SwitchTimerExpired(0)))
            .expect("fits");
        assert_eq!(text.as_str(), "pdm switch 1 timer expired");
    }
}
