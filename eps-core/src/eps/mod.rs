//! Board orchestrator: bus topology, channel registry, watchdog and time.
//!
//! [`Eps`] owns every bus and channel on the board. Commands arrive through
//! [`Eps::write`] (see [`dispatch`]) and simulated time through
//! [`Eps::set_time`]. Host tooling uses the remaining accessors to inject
//! telemetry and flip switches the way a bench operator would.

mod dispatch;

pub use dispatch::Verdict;

use core::fmt;

use heapless::Vec;

use crate::SimTime;
use crate::bus::{BusGraph, BusId, BusKind, BusNode, PcmRail, PdmSwitch};
use crate::channel::{self, BoardSignal, Channel, ChannelCode, ChannelSlot, ChannelTelemetry};
use crate::events::{EpsEvent, EventSink, NoopEventSink};
use crate::protocol::{ByteSwap, Response};
use crate::status::{ResetType, Status};
use crate::version::Version;

#[cfg(feature = "alloc")]
use alloc::collections::BTreeMap;

/// Default watchdog timeout (4 minutes).
pub const DEFAULT_WDT_TIMEOUT_MS: SimTime = 4 * 60 * 1000;
/// Settle time before a reset bus is released.
pub const BUS_RESET_TIME_MS: SimTime = 500;
/// Number of switched PDM outputs.
pub const NUM_SWITCHES: usize = 10;
/// Buses on the board: one BCR bus, four PCM rails and the PDM switches.
pub const BUS_COUNT: usize = 1 + PcmRail::ALL.len() + NUM_SWITCHES;

const BCR_BUS: BusId = BusId::new(0);
const PCM_BASE: u8 = 1;
#[allow(clippy::cast_possible_truncation)]
const PDM_BASE: u8 = PCM_BASE + PcmRail::ALL.len() as u8;

// Rail order matches the `PcmRail` discriminants.
const PDM_FEEDS: [PcmRail; NUM_SWITCHES] = [
    PcmRail::Rail12V,
    PcmRail::Rail12V,
    PcmRail::Rail5V,
    PcmRail::Rail3V3,
    PcmRail::Rail5V,
    PcmRail::Rail5V,
    PcmRail::Rail5V,
    PcmRail::Rail3V3,
    PcmRail::Rail3V3,
    PcmRail::Rail3V3,
];

const PDM_NAMES: [&str; NUM_SWITCHES] = [
    "PDM_BUS_1",
    "PDM_BUS_2",
    "PDM_BUS_3",
    "PDM_BUS_4",
    "PDM_BUS_5",
    "PDM_BUS_6",
    "PDM_BUS_7",
    "PDM_BUS_8",
    "PDM_BUS_9",
    "PDM_BUS_10",
];

#[allow(clippy::cast_possible_truncation)]
const fn pcm_bus(rail: PcmRail) -> BusId {
    BusId::new(PCM_BASE + rail.index() as u8)
}

#[allow(clippy::cast_possible_truncation)]
const fn pdm_bus(index: usize) -> BusId {
    BusId::new(PDM_BASE + index as u8)
}

/// Construction parameters for a board.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EpsConfig {
    pub address: u8,
    pub daughterboard: bool,
    pub swap: ByteSwap,
}

/// Host-side lookup failures for telemetry channels.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelError {
    UnknownChannel(ChannelCode),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::UnknownChannel(code) => write!(f, "invalid telemetry channel: {code}"),
        }
    }
}

/// Host-side switch addressing failures. Indices are zero-based.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchError {
    OutOfRange(usize),
}

impl fmt::Display for SwitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchError::OutOfRange(index) => write!(f, "invalid switch number: {index}"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct PendingRelease {
    expiry_ms: SimTime,
    bus: BusId,
}

/// Simulated EPS board.
pub struct Eps<S: EventSink = NoopEventSink> {
    address: u8,
    swap: ByteSwap,
    response: Response,
    time_ms: SimTime,
    version: Version,
    status: Status,
    daughterboard: bool,
    db_version: Version,
    db_status: Status,
    buses: BusGraph<BUS_COUNT>,
    board_channels: [Channel; BoardSignal::ALL.len()],
    wdt_elapsed_ms: SimTime,
    wdt_timeout_ms: SimTime,
    pending: Vec<PendingRelease, BUS_COUNT>,
    sink: S,
}

impl Eps<NoopEventSink> {
    #[must_use]
    pub fn new(config: EpsConfig) -> Self {
        Self::with_sink(config, NoopEventSink)
    }
}

impl<S: EventSink> Eps<S> {
    /// Builds a board with its fixed bus topology wired up.
    #[must_use]
    pub fn with_sink(config: EpsConfig, sink: S) -> Self {
        Self {
            address: config.address,
            swap: config.swap,
            response: Response::new(),
            time_ms: 0,
            version: Version::default(),
            status: Status::new(),
            daughterboard: config.daughterboard,
            db_version: Version::default(),
            db_status: Status::new(),
            buses: build_topology(),
            board_channels: [Channel::linear(); BoardSignal::ALL.len()],
            wdt_elapsed_ms: 0,
            wdt_timeout_ms: DEFAULT_WDT_TIMEOUT_MS,
            pending: Vec::new(),
            sink,
        }
    }

    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub const fn byte_swap(&self) -> ByteSwap {
        self.swap
    }

    #[must_use]
    pub const fn has_daughterboard(&self) -> bool {
        self.daughterboard
    }

    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time_ms
    }

    /// The board is unreachable while the top-level bus is in reset.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.buses.is_reset(BCR_BUS)
    }

    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    #[must_use]
    pub const fn daughterboard_version(&self) -> Version {
        self.db_version
    }

    pub fn set_daughterboard_version(&mut self, version: Version) {
        self.db_version = version;
    }

    #[must_use]
    pub const fn daughterboard_status(&self) -> &Status {
        &self.db_status
    }

    pub fn set_daughterboard_status(&mut self, status: Status) {
        self.db_status = status;
    }

    #[must_use]
    pub const fn wdt_timeout(&self) -> SimTime {
        self.wdt_timeout_ms
    }

    #[must_use]
    pub const fn wdt_elapsed(&self) -> SimTime {
        self.wdt_elapsed_ms
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub const fn buses(&self) -> &BusGraph<BUS_COUNT> {
        &self.buses
    }

    /// Bitmask of PCM rails that are powered (bit per [`PcmRail::mask`]).
    #[must_use]
    pub fn pcm_state(&self) -> u8 {
        PcmRail::ALL
            .into_iter()
            .filter(|rail| !self.buses.is_reset(pcm_bus(*rail)))
            .fold(0, |mask, rail| mask | rail.mask())
    }

    /// Advances simulated time.
    ///
    /// Feeds the watchdog (unless the board is in reset), runs every switch
    /// timer, releases expired bus resets in expiry order and finally trips
    /// the watchdog if its timeout has been reached.
    pub fn set_time(&mut self, time_ms: SimTime) {
        if !self.is_reset() {
            self.wdt_elapsed_ms = self
                .wdt_elapsed_ms
                .saturating_add(time_ms.saturating_sub(self.time_ms));
        }
        self.time_ms = time_ms;

        for index in 0..NUM_SWITCHES {
            let expired = self
                .buses
                .node_mut(pdm_bus(index))
                .switch_mut()
                .is_some_and(|switch| switch.set_time(time_ms));
            if expired {
                self.emit(EpsEvent::SwitchTimerExpired(index));
            }
        }

        while let Some(next) = self.pending.first().copied() {
            if next.expiry_ms > time_ms {
                break;
            }
            self.pending.remove(0);
            // A bus under a parent that is still in reset comes back with it.
            if self.buses.reset(next.bus, false) {
                let name = self.buses.node(next.bus).name();
                self.emit(EpsEvent::BusResetReleased(name));
            }
        }

        if self.wdt_elapsed_ms >= self.wdt_timeout_ms {
            self.emit(EpsEvent::WatchdogExpired);
            self.wdt_elapsed_ms = 0;
            self.reset_bus(BCR_BUS);
            self.status.set_reset(ResetType::Watchdog);
        }
    }

    /// Advances simulated time by `delta_ms`.
    pub fn advance(&mut self, delta_ms: SimTime) {
        self.set_time(self.time_ms.saturating_add(delta_ms));
    }

    /// Reading of one channel, with unknown codes reported to the caller.
    ///
    /// Host tools use this to reject a mistyped code. See
    /// [`Eps::read_telemetry`] for the lenient read.
    pub fn telemetry(&self, code: ChannelCode) -> Result<ChannelTelemetry, ChannelError> {
        self.registered_channel(code)
            .map(Channel::telemetry)
            .ok_or(ChannelError::UnknownChannel(code))
    }

    /// Reading of one channel. An unknown code is logged as
    /// [`EpsEvent::UnknownChannel`] and reads as zero.
    pub fn read_telemetry(&mut self, code: ChannelCode) -> ChannelTelemetry {
        match self.telemetry(code) {
            Ok(reading) => reading,
            Err(ChannelError::UnknownChannel(code)) => {
                self.emit(EpsEvent::UnknownChannel(code));
                ChannelTelemetry::default()
            }
        }
    }

    /// Every registered channel with its current reading, in catalog order.
    pub fn telemetry_iter(&self) -> impl Iterator<Item = (ChannelCode, ChannelTelemetry)> + '_ {
        channel::channels().iter().filter_map(|info| {
            self.channel(info.slot)
                .map(|found| (info.code, found.telemetry()))
        })
    }

    /// Every registered channel keyed by code.
    #[cfg(feature = "alloc")]
    #[must_use]
    pub fn telemetry_map(&self) -> BTreeMap<ChannelCode, ChannelTelemetry> {
        self.telemetry_iter().collect()
    }

    /// Sets the analog value of a channel.
    pub fn set_telemetry(&mut self, code: ChannelCode, value: f64) -> Result<(), ChannelError> {
        self.emit(EpsEvent::TelemetryUpdated { code, value });
        match self.registered_channel_mut(code) {
            Some(channel) => {
                channel.set_value(value);
                Ok(())
            }
            None => {
                self.emit(EpsEvent::UnknownChannel(code));
                Err(ChannelError::UnknownChannel(code))
            }
        }
    }

    /// Applies converter coefficients to a channel.
    pub fn configure_channel(&mut self, code: ChannelCode, params: &[f64]) -> Result<(), ChannelError> {
        match self.registered_channel_mut(code) {
            Some(channel) => {
                channel.configure(params);
                self.emit(EpsEvent::ChannelConfigured(code));
                Ok(())
            }
            None => {
                self.emit(EpsEvent::UnknownChannel(code));
                Err(ChannelError::UnknownChannel(code))
            }
        }
    }

    /// Direct access to a switch (zero-based).
    pub fn switch(&self, index: usize) -> Result<&PdmSwitch, SwitchError> {
        if index >= NUM_SWITCHES {
            return Err(SwitchError::OutOfRange(index));
        }
        self.buses
            .node(pdm_bus(index))
            .switch()
            .ok_or(SwitchError::OutOfRange(index))
    }

    /// Reported (masked) state of a switch.
    pub fn switch_state(&self, index: usize) -> Result<bool, SwitchError> {
        self.switch(index).map(PdmSwitch::state)
    }

    pub fn switch_initial_state(&self, index: usize) -> Result<bool, SwitchError> {
        self.switch(index).map(PdmSwitch::initial_state)
    }

    /// Commands a switch on or off as the operator would.
    pub fn set_switch_state(&mut self, index: usize, on: bool) -> Result<(), SwitchError> {
        self.emit(EpsEvent::SwitchStateUpdated { index, on });
        self.command_switch(index, on)
    }

    pub fn set_switch_initial_state(&mut self, index: usize, on: bool) -> Result<(), SwitchError> {
        self.emit(EpsEvent::SwitchInitialStateUpdated { index, on });
        match self.switch_mut(index) {
            Some(switch) => {
                switch.set_initial_state(on);
                Ok(())
            }
            None => {
                self.emit(EpsEvent::InvalidSwitch(index));
                Err(SwitchError::OutOfRange(index))
            }
        }
    }

    fn command_switch(&mut self, index: usize, on: bool) -> Result<(), SwitchError> {
        if index < NUM_SWITCHES && self.buses.node_mut(pdm_bus(index)).set_switch_state(on) {
            Ok(())
        } else {
            self.emit(EpsEvent::InvalidSwitch(index));
            Err(SwitchError::OutOfRange(index))
        }
    }

    fn switch_mut(&mut self, index: usize) -> Option<&mut PdmSwitch> {
        if index < NUM_SWITCHES {
            self.buses.node_mut(pdm_bus(index)).switch_mut()
        } else {
            None
        }
    }

    /// Puts a bus into reset and schedules its release. A bus that is already
    /// in reset is left alone.
    fn reset_bus(&mut self, bus: BusId) {
        let name = self.buses.node(bus).name();
        if self.buses.is_reset(bus) {
            self.emit(EpsEvent::BusAlreadyReset(name));
            return;
        }

        self.emit(EpsEvent::BusResetAsserted(name));
        self.buses.reset(bus, true);
        self.schedule_release(bus, self.time_ms.saturating_add(BUS_RESET_TIME_MS));
    }

    fn schedule_release(&mut self, bus: BusId, expiry_ms: SimTime) {
        self.pending.retain(|entry| entry.bus != bus);
        let entry = PendingRelease { expiry_ms, bus };
        let position = self
            .pending
            .iter()
            .position(|other| *other > entry)
            .unwrap_or(self.pending.len());
        // One entry per bus keeps this within capacity.
        let _ = self.pending.insert(position, entry);
    }

    /// Channel behind a catalog slot, or `None` when the slot does not
    /// match the topology.
    fn channel(&self, slot: ChannelSlot) -> Option<&Channel> {
        match slot {
            ChannelSlot::Board(signal) => self.board_channels.get(signal.index()),
            ChannelSlot::Bcr { index, signal } => match self.buses.node(BCR_BUS).kind() {
                BusKind::Bcr(bcrs) => bcrs
                    .get(usize::from(index))
                    .map(|bcr| bcr.channel(signal)),
                BusKind::Pcm(_) | BusKind::Pdm(_) => None,
            },
            ChannelSlot::Pcm { rail, signal } => match self.buses.node(pcm_bus(rail)).kind() {
                BusKind::Pcm(channels) => Some(channels.channel(signal)),
                BusKind::Bcr(_) | BusKind::Pdm(_) => None,
            },
            ChannelSlot::Switch { index, signal } => {
                let index = usize::from(index);
                if index >= NUM_SWITCHES {
                    return None;
                }
                match self.buses.node(pdm_bus(index)).kind() {
                    BusKind::Pdm(switch) => Some(switch.channels().channel(signal)),
                    BusKind::Bcr(_) | BusKind::Pcm(_) => None,
                }
            }
        }
    }

    fn channel_mut(&mut self, slot: ChannelSlot) -> Option<&mut Channel> {
        let Self {
            buses,
            board_channels,
            ..
        } = self;
        match slot {
            ChannelSlot::Board(signal) => board_channels.get_mut(signal.index()),
            ChannelSlot::Bcr { index, signal } => match buses.node_mut(BCR_BUS).kind_mut() {
                BusKind::Bcr(bcrs) => bcrs
                    .get_mut(usize::from(index))
                    .map(|bcr| bcr.channel_mut(signal)),
                BusKind::Pcm(_) | BusKind::Pdm(_) => None,
            },
            ChannelSlot::Pcm { rail, signal } => match buses.node_mut(pcm_bus(rail)).kind_mut() {
                BusKind::Pcm(channels) => Some(channels.channel_mut(signal)),
                BusKind::Bcr(_) | BusKind::Pdm(_) => None,
            },
            ChannelSlot::Switch { index, signal } => {
                let index = usize::from(index);
                if index >= NUM_SWITCHES {
                    return None;
                }
                match buses.node_mut(pdm_bus(index)).kind_mut() {
                    BusKind::Pdm(switch) => Some(switch.channels_mut().channel_mut(signal)),
                    BusKind::Bcr(_) | BusKind::Pcm(_) => None,
                }
            }
        }
    }

    /// Channel registered under `code`.
    fn registered_channel(&self, code: ChannelCode) -> Option<&Channel> {
        channel::lookup(code).and_then(|info| self.channel(info.slot))
    }

    fn registered_channel_mut(&mut self, code: ChannelCode) -> Option<&mut Channel> {
        channel::lookup(code).and_then(|info| self.channel_mut(info.slot))
    }

    fn emit(&mut self, event: EpsEvent) {
        self.sink.record(self.time_ms, event);
    }
}

fn build_topology() -> BusGraph<BUS_COUNT> {
    let mut graph = BusGraph::new([
        BusNode::new("BCR_BUS", BusKind::bcr()),
        BusNode::new(PcmRail::Battery.bus_name(), BusKind::pcm()),
        BusNode::new(PcmRail::Rail5V.bus_name(), BusKind::pcm()),
        BusNode::new(PcmRail::Rail3V3.bus_name(), BusKind::pcm()),
        BusNode::new(PcmRail::Rail12V.bus_name(), BusKind::pcm()),
        BusNode::new(PDM_NAMES[0], BusKind::pdm()),
        BusNode::new(PDM_NAMES[1], BusKind::pdm()),
        BusNode::new(PDM_NAMES[2], BusKind::pdm()),
        BusNode::new(PDM_NAMES[3], BusKind::pdm()),
        BusNode::new(PDM_NAMES[4], BusKind::pdm()),
        BusNode::new(PDM_NAMES[5], BusKind::pdm()),
        BusNode::new(PDM_NAMES[6], BusKind::pdm()),
        BusNode::new(PDM_NAMES[7], BusKind::pdm()),
        BusNode::new(PDM_NAMES[8], BusKind::pdm()),
        BusNode::new(PDM_NAMES[9], BusKind::pdm()),
    ]);

    for rail in PcmRail::ALL {
        graph.connect(BCR_BUS, pcm_bus(rail));
    }
    for (index, rail) in PDM_FEEDS.into_iter().enumerate() {
        graph.connect(pcm_bus(rail), pdm_bus(index));
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRecorder;

    #[test]
    fn topology_matches_board_wiring() {
        let graph = build_topology();
        assert_eq!(graph.node(BCR_BUS).children().len(), 4);
        assert!(graph.node(pcm_bus(PcmRail::Battery)).children().is_empty());
        assert_eq!(graph.node(pcm_bus(PcmRail::Rail5V)).children().len(), 4);
        assert_eq!(graph.node(pcm_bus(PcmRail::Rail3V3)).children().len(), 4);
        assert_eq!(graph.node(pcm_bus(PcmRail::Rail12V)).children().len(), 2);
        assert!(
            graph
                .node(pdm_bus(3))
                .parents()
                .contains(pcm_bus(PcmRail::Rail3V3))
        );
        assert_eq!(graph.node(pdm_bus(9)).name(), "PDM_BUS_10");
    }

    #[test]
    fn rescheduling_replaces_pending_release() {
        let mut eps = Eps::new(EpsConfig::default());
        eps.schedule_release(pcm_bus(PcmRail::Rail5V), 900);
        eps.schedule_release(pcm_bus(PcmRail::Battery), 500);
        eps.schedule_release(pcm_bus(PcmRail::Rail5V), 700);

        let order: Vec<(SimTime, BusId), BUS_COUNT> = eps
            .pending
            .iter()
            .map(|entry| (entry.expiry_ms, entry.bus))
            .collect();
        assert_eq!(
            order.as_slice(),
            [
                (500, pcm_bus(PcmRail::Battery)),
                (700, pcm_bus(PcmRail::Rail5V))
            ]
        );
    }

    #[test]
    fn unknown_channel_is_reported() {
        let mut eps = Eps::with_sink(EpsConfig::default(), EventRecorder::<8>::new());
        let code = ChannelCode::new(0x1234);
        assert_eq!(
            eps.set_telemetry(code, 1.0),
            Err(ChannelError::UnknownChannel(code))
        );
        assert!(eps.telemetry(code).is_err());
        assert!(
            eps.sink()
                .contains(|event| *event == EpsEvent::UnknownChannel(code))
        );
    }

    #[test]
    fn lenient_read_of_unknown_channel_is_zero_and_logged() {
        let mut eps = Eps::with_sink(EpsConfig::default(), EventRecorder::<8>::new());
        let code = ChannelCode::new(0xbeef);
        assert_eq!(eps.read_telemetry(code), ChannelTelemetry::default());
        assert!(
            eps.sink()
                .contains(|event| *event == EpsEvent::UnknownChannel(code))
        );

        eps.set_telemetry(ChannelCode::TBRD, 25.0)
            .expect("TBRD is registered");
        assert_eq!(eps.read_telemetry(ChannelCode::TBRD).raw, 25);
    }

    #[test]
    fn every_catalog_slot_resolves_to_a_channel() {
        let eps = Eps::new(EpsConfig::default());
        for info in channel::channels() {
            assert!(
                eps.channel(info.slot).is_some(),
                "{} has no backing channel",
                info.code
            );
        }
        assert_eq!(eps.telemetry_iter().count(), channel::channels().len());
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn telemetry_map_is_keyed_by_code() {
        let mut eps = Eps::new(EpsConfig::default());
        eps.set_telemetry(ChannelCode::VPCM5V, 5.0)
            .expect("rail channel");
        let map = eps.telemetry_map();

        assert_eq!(map.len(), channel::channels().len());
        assert_eq!(map.get(&ChannelCode::VPCM5V).map(|reading| reading.raw), Some(5));
        assert!(!map.contains_key(&ChannelCode::new(0xbeef)));
        assert!(map.keys().zip(map.keys().skip(1)).all(|(a, b)| a < b));

        eps.set_telemetry(ChannelCode::VPCM5V, 3.0)
            .expect("rail channel");
        assert_eq!(
            map.get(&ChannelCode::VPCM5V).map(|reading| reading.raw),
            Some(5),
            "the map is a snapshot"
        );
    }

    #[test]
    fn board_channels_ignore_bus_resets() {
        let mut eps = Eps::new(EpsConfig::default());
        eps.set_telemetry(ChannelCode::TBRD, 25.0)
            .expect("TBRD is registered");
        eps.reset_bus(BCR_BUS);
        let reading = eps.telemetry(ChannelCode::TBRD).expect("TBRD reading");
        assert_eq!(reading.raw, 25);
    }
}
