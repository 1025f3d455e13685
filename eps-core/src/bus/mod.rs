//! Reset-propagation graph for the board's power buses.
//!
//! Buses live in a fixed-size arena and refer to each other through [`BusId`]
//! handles. Parent and child membership is stored as bit sets over the arena,
//! so the topology carries no back-pointers and can be inspected directly in
//! tests. Each node carries a closed [`BusKind`] whose `on_reset` hook updates
//! the channels that the bus owns.

pub mod pdm;

use core::fmt;

use crate::channel::{BcrSignal, Channel, PowerSignal};

pub use pdm::{PdmSwitch, TimerMode};

/// Largest arena supported by the bit-set membership encoding.
pub const MAX_BUSES: usize = 32;

/// Number of battery charge regulators on the BCR bus.
pub const NUM_BCRS: usize = 5;

/// Handle to a bus node inside a [`BusGraph`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BusId(u8);

impl BusId {
    pub(crate) const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    const fn bit(self) -> u32 {
        1 << self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

/// Set of bus handles stored as a bitmap over the arena.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BusSet(u32);

impl BusSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, id: BusId) -> bool {
        self.0 & id.bit() != 0
    }

    fn insert(&mut self, id: BusId) {
        self.0 |= id.bit();
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates members in arena order.
    pub fn iter(self) -> impl Iterator<Item = BusId> {
        let mut remaining = self.0;
        core::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let index = remaining.trailing_zeros() as u8;
            remaining &= remaining - 1;
            Some(BusId(index))
        })
    }
}

/// Power conditioning rails. The discriminant is the bit used by `SET_PCM_RESET`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PcmRail {
    Battery,
    Rail5V,
    Rail3V3,
    Rail12V,
}

impl PcmRail {
    pub const ALL: [PcmRail; 4] = [
        PcmRail::Battery,
        PcmRail::Rail5V,
        PcmRail::Rail3V3,
        PcmRail::Rail12V,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            PcmRail::Battery => 0,
            PcmRail::Rail5V => 1,
            PcmRail::Rail3V3 => 2,
            PcmRail::Rail12V => 3,
        }
    }

    /// Bit selecting this rail in a PCM reset mask.
    #[must_use]
    pub const fn mask(self) -> u8 {
        1 << self.index()
    }

    #[must_use]
    pub const fn bus_name(self) -> &'static str {
        match self {
            PcmRail::Battery => "PCM_BUS_BATTERY",
            PcmRail::Rail5V => "PCM_BUS_5V",
            PcmRail::Rail3V3 => "PCM_BUS_3.3V",
            PcmRail::Rail12V => "PCM_BUS_12V",
        }
    }
}

/// Voltage and current channels measured on a PCM rail or PDM switch.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PowerChannels {
    voltage: Channel,
    current: Channel,
}

impl PowerChannels {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            voltage: Channel::linear(),
            current: Channel::linear(),
        }
    }

    #[must_use]
    pub const fn voltage(&self) -> &Channel {
        &self.voltage
    }

    #[must_use]
    pub const fn current(&self) -> &Channel {
        &self.current
    }

    #[must_use]
    pub const fn channel(&self, signal: PowerSignal) -> &Channel {
        match signal {
            PowerSignal::Voltage => &self.voltage,
            PowerSignal::Current => &self.current,
        }
    }

    pub fn channel_mut(&mut self, signal: PowerSignal) -> &mut Channel {
        match signal {
            PowerSignal::Voltage => &mut self.voltage,
            PowerSignal::Current => &mut self.current,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.voltage.set_active(active);
        self.current.set_active(active);
    }
}

/// Channels sampled on one battery charge regulator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BcrChannels {
    voltage: Channel,
    current: [Channel; 2],
    temperature: [Channel; 2],
    sun: [Channel; 2],
}

impl BcrChannels {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            voltage: Channel::linear(),
            current: [Channel::linear(); 2],
            temperature: [Channel::linear(); 2],
            sun: [Channel::threshold(); 2],
        }
    }

    #[must_use]
    pub const fn channel(&self, signal: BcrSignal) -> &Channel {
        match signal {
            BcrSignal::Voltage => &self.voltage,
            BcrSignal::CurrentA => &self.current[0],
            BcrSignal::CurrentB => &self.current[1],
            BcrSignal::TemperatureA => &self.temperature[0],
            BcrSignal::TemperatureB => &self.temperature[1],
            BcrSignal::SunA => &self.sun[0],
            BcrSignal::SunB => &self.sun[1],
        }
    }

    pub fn channel_mut(&mut self, signal: BcrSignal) -> &mut Channel {
        match signal {
            BcrSignal::Voltage => &mut self.voltage,
            BcrSignal::CurrentA => &mut self.current[0],
            BcrSignal::CurrentB => &mut self.current[1],
            BcrSignal::TemperatureA => &mut self.temperature[0],
            BcrSignal::TemperatureB => &mut self.temperature[1],
            BcrSignal::SunA => &mut self.sun[0],
            BcrSignal::SunB => &mut self.sun[1],
        }
    }

    fn set_active(&mut self, active: bool) {
        self.voltage.set_active(active);
        for channel in self
            .current
            .iter_mut()
            .chain(self.temperature.iter_mut())
            .chain(self.sun.iter_mut())
        {
            channel.set_active(active);
        }
    }
}

impl Default for BcrChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Subtype-specific state carried by a bus node.
#[derive(Clone, Debug, PartialEq)]
pub enum BusKind {
    Bcr([BcrChannels; NUM_BCRS]),
    Pcm(PowerChannels),
    Pdm(PdmSwitch),
}

impl BusKind {
    #[must_use]
    pub const fn bcr() -> Self {
        BusKind::Bcr([BcrChannels::new(); NUM_BCRS])
    }

    #[must_use]
    pub const fn pcm() -> Self {
        BusKind::Pcm(PowerChannels::new())
    }

    #[must_use]
    pub fn pdm() -> Self {
        BusKind::Pdm(PdmSwitch::new())
    }

    fn on_reset(&mut self, reset: bool) {
        match self {
            BusKind::Bcr(bcrs) => {
                for bcr in bcrs {
                    bcr.set_active(!reset);
                }
            }
            BusKind::Pcm(channels) => channels.set_active(!reset),
            BusKind::Pdm(switch) => switch.on_reset(reset),
        }
    }
}

/// Arena entry for a single bus.
#[derive(Clone, Debug, PartialEq)]
pub struct BusNode {
    name: &'static str,
    kind: BusKind,
    parents: BusSet,
    children: BusSet,
    reset: bool,
}

impl BusNode {
    #[must_use]
    pub const fn new(name: &'static str, kind: BusKind) -> Self {
        Self {
            name,
            kind,
            parents: BusSet::empty(),
            children: BusSet::empty(),
            reset: false,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &BusKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut BusKind {
        &mut self.kind
    }

    #[must_use]
    pub const fn parents(&self) -> BusSet {
        self.parents
    }

    #[must_use]
    pub const fn children(&self) -> BusSet {
        self.children
    }

    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.reset
    }

    /// Switch carried by a PDM node.
    #[must_use]
    pub const fn switch(&self) -> Option<&PdmSwitch> {
        match &self.kind {
            BusKind::Pdm(switch) => Some(switch),
            BusKind::Bcr(_) | BusKind::Pcm(_) => None,
        }
    }

    pub fn switch_mut(&mut self) -> Option<&mut PdmSwitch> {
        match &mut self.kind {
            BusKind::Pdm(switch) => Some(switch),
            BusKind::Bcr(_) | BusKind::Pcm(_) => None,
        }
    }

    /// Commands a PDM node on or off, honouring the node's own reset state.
    /// Returns `false` when the node is not a switch.
    pub fn set_switch_state(&mut self, on: bool) -> bool {
        let reset = self.reset;
        match &mut self.kind {
            BusKind::Pdm(switch) => {
                switch.set_state(on, reset);
                true
            }
            BusKind::Bcr(_) | BusKind::Pcm(_) => false,
        }
    }
}

/// Fixed-size arena of buses wired into a reset-propagation graph.
#[derive(Clone, Debug, PartialEq)]
pub struct BusGraph<const N: usize> {
    nodes: [BusNode; N],
}

impl<const N: usize> BusGraph<N> {
    /// Builds an arena from its nodes. Node `i` receives handle `i`.
    #[must_use]
    pub const fn new(nodes: [BusNode; N]) -> Self {
        const {
            assert!(N <= MAX_BUSES, "bus arena exceeds bit-set capacity");
        }
        Self { nodes }
    }

    /// Handle of the node at `index`, if it exists.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn id(&self, index: usize) -> Option<BusId> {
        if index < N {
            Some(BusId(index as u8))
        } else {
            None
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = BusId> + use<N> {
        #[allow(clippy::cast_possible_truncation)]
        (0..N).map(|index| BusId(index as u8))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    #[must_use]
    pub fn node(&self, id: BusId) -> &BusNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: BusId) -> &mut BusNode {
        &mut self.nodes[id.index()]
    }

    /// Registers `child` as a reset sink of `parent`.
    pub fn connect(&mut self, parent: BusId, child: BusId) {
        self.nodes[parent.index()].children.insert(child);
        self.nodes[child.index()].parents.insert(parent);
    }

    #[must_use]
    pub fn is_reset(&self, id: BusId) -> bool {
        self.nodes[id.index()].reset
    }

    /// Returns `true` when any direct parent of `id` is in reset.
    #[must_use]
    pub fn has_parent_in_reset(&self, id: BusId) -> bool {
        self.nodes[id.index()]
            .parents
            .iter()
            .any(|parent| self.nodes[parent.index()].reset)
    }

    /// Drives a bus into or out of reset.
    ///
    /// Entering reset always propagates to every descendant. Leaving reset is
    /// refused while any parent is still in reset; otherwise children are
    /// released in turn under the same rule. Each node fires its `on_reset`
    /// hook after its children. Returns `true` when `id` changed state.
    pub fn reset(&mut self, id: BusId, reset: bool) -> bool {
        let node = &self.nodes[id.index()];
        if node.reset == reset {
            return false;
        }
        if !reset && self.has_parent_in_reset(id) {
            return false;
        }

        self.nodes[id.index()].reset = reset;
        for child in self.nodes[id.index()].children.iter() {
            self.reset(child, reset);
        }
        self.nodes[id.index()].kind.on_reset(reset);
        true
    }
}
