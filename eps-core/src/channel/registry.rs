//! Static catalog of telemetry channel codes.
//!
//! Every code the board answers to is listed in [`CHANNELS`] together with its
//! canonical name and the storage slot that backs it. The orchestrator
//! resolves slots against its bus graph; the table itself holds no state.

use core::fmt;

use crate::bus::PcmRail;

/// Number of addressable telemetry channels.
pub const CHANNEL_COUNT: usize = 68;

/// Numeric address of a telemetry point.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ChannelCode(u16);

impl ChannelCode {
    pub const VBCR1: ChannelCode = ChannelCode(0xe110);
    pub const SDBCR1A: ChannelCode = ChannelCode(0xe11c);
    pub const VPCM3V3: ChannelCode = ChannelCode(0xe200);
    pub const IPCM3V3: ChannelCode = ChannelCode(0xe204);
    pub const VPCM5V: ChannelCode = ChannelCode(0xe210);
    pub const IPCM5V: ChannelCode = ChannelCode(0xe214);
    pub const VPCMBATV: ChannelCode = ChannelCode(0xe220);
    pub const IPCMBATV: ChannelCode = ChannelCode(0xe224);
    pub const VPCM12V: ChannelCode = ChannelCode(0xe230);
    pub const IPCM12V: ChannelCode = ChannelCode(0xe234);
    pub const TBRD: ChannelCode = ChannelCode(0xe308);

    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Voltage or current code of a BCR (`index` 0..5).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bcr(index: usize, signal: BcrSignal) -> Self {
        let base = 0xe110 + (index as u16) * 0x10;
        Self(base + signal.offset())
    }

    /// Voltage or current code of a PDM switch (`index` 0..10).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn switch(index: usize, signal: PowerSignal) -> Self {
        let base = 0xe410 + (index as u16) * 0x10;
        match signal {
            PowerSignal::Voltage => Self(base),
            PowerSignal::Current => Self(base + 4),
        }
    }

    /// Canonical name of a registered code.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        lookup(self).map(|info| info.name)
    }
}

impl fmt::Display for ChannelCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}(0x{:04x})", self.0),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// Signals measured on each battery charge regulator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BcrSignal {
    Voltage,
    CurrentA,
    CurrentB,
    TemperatureA,
    TemperatureB,
    SunA,
    SunB,
}

impl BcrSignal {
    const fn offset(self) -> u16 {
        match self {
            BcrSignal::Voltage => 0x0,
            BcrSignal::CurrentA => 0x4,
            BcrSignal::CurrentB => 0x5,
            BcrSignal::TemperatureA => 0x8,
            BcrSignal::TemperatureB => 0x9,
            BcrSignal::SunA => 0xc,
            BcrSignal::SunB => 0xd,
        }
    }
}

/// Voltage/current pair measured on PCM buses and PDM switches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerSignal {
    Voltage,
    Current,
}

/// Board-level channels that belong to no bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoardSignal {
    DiodeVoltage,
    DiodeCurrent,
    Draw3V3,
    Draw5V,
    Temperature,
}

impl BoardSignal {
    pub const ALL: [BoardSignal; 5] = [
        BoardSignal::DiodeVoltage,
        BoardSignal::DiodeCurrent,
        BoardSignal::Draw3V3,
        BoardSignal::Draw5V,
        BoardSignal::Temperature,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            BoardSignal::DiodeVoltage => 0,
            BoardSignal::DiodeCurrent => 1,
            BoardSignal::Draw3V3 => 2,
            BoardSignal::Draw5V => 3,
            BoardSignal::Temperature => 4,
        }
    }
}

/// Storage location backing a channel code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelSlot {
    Bcr { index: u8, signal: BcrSignal },
    Pcm { rail: PcmRail, signal: PowerSignal },
    Switch { index: u8, signal: PowerSignal },
    Board(BoardSignal),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelInfo {
    pub code: ChannelCode,
    pub name: &'static str,
    pub slot: ChannelSlot,
}

const fn bcr(code: u16, name: &'static str, index: u8, signal: BcrSignal) -> ChannelInfo {
    ChannelInfo {
        code: ChannelCode(code),
        name,
        slot: ChannelSlot::Bcr { index, signal },
    }
}

const fn pcm(code: u16, name: &'static str, rail: PcmRail, signal: PowerSignal) -> ChannelInfo {
    ChannelInfo {
        code: ChannelCode(code),
        name,
        slot: ChannelSlot::Pcm { rail, signal },
    }
}

const fn switch(code: u16, name: &'static str, index: u8, signal: PowerSignal) -> ChannelInfo {
    ChannelInfo {
        code: ChannelCode(code),
        name,
        slot: ChannelSlot::Switch { index, signal },
    }
}

const fn board(code: u16, name: &'static str, signal: BoardSignal) -> ChannelInfo {
    ChannelInfo {
        code: ChannelCode(code),
        name,
        slot: ChannelSlot::Board(signal),
    }
}

pub const CHANNELS: [ChannelInfo; CHANNEL_COUNT] = [
    bcr(0xe110, "VBCR1", 0, BcrSignal::Voltage),
    bcr(0xe114, "IBCR1A", 0, BcrSignal::CurrentA),
    bcr(0xe115, "IBCR1B", 0, BcrSignal::CurrentB),
    bcr(0xe118, "TBCR1A", 0, BcrSignal::TemperatureA),
    bcr(0xe119, "TBCR1B", 0, BcrSignal::TemperatureB),
    bcr(0xe11c, "SDBCR1A", 0, BcrSignal::SunA),
    bcr(0xe11d, "SDBCR1B", 0, BcrSignal::SunB),
    bcr(0xe120, "VBCR2", 1, BcrSignal::Voltage),
    bcr(0xe124, "IBCR2A", 1, BcrSignal::CurrentA),
    bcr(0xe125, "IBCR2B", 1, BcrSignal::CurrentB),
    bcr(0xe128, "TBCR2A", 1, BcrSignal::TemperatureA),
    bcr(0xe129, "TBCR2B", 1, BcrSignal::TemperatureB),
    bcr(0xe12c, "SDBCR2A", 1, BcrSignal::SunA),
    bcr(0xe12d, "SDBCR2B", 1, BcrSignal::SunB),
    bcr(0xe130, "VBCR3", 2, BcrSignal::Voltage),
    bcr(0xe134, "IBCR3A", 2, BcrSignal::CurrentA),
    bcr(0xe135, "IBCR3B", 2, BcrSignal::CurrentB),
    bcr(0xe138, "TBCR3A", 2, BcrSignal::TemperatureA),
    bcr(0xe139, "TBCR3B", 2, BcrSignal::TemperatureB),
    bcr(0xe13c, "SDBCR3A", 2, BcrSignal::SunA),
    bcr(0xe13d, "SDBCR3B", 2, BcrSignal::SunB),
    bcr(0xe140, "VBCR4", 3, BcrSignal::Voltage),
    bcr(0xe144, "IBCR4A", 3, BcrSignal::CurrentA),
    bcr(0xe145, "IBCR4B", 3, BcrSignal::CurrentB),
    bcr(0xe148, "TBCR4A", 3, BcrSignal::TemperatureA),
    bcr(0xe149, "TBCR4B", 3, BcrSignal::TemperatureB),
    bcr(0xe14c, "SDBCR4A", 3, BcrSignal::SunA),
    bcr(0xe14d, "SDBCR4B", 3, BcrSignal::SunB),
    bcr(0xe150, "VBCR5", 4, BcrSignal::Voltage),
    bcr(0xe154, "IBCR5A", 4, BcrSignal::CurrentA),
    bcr(0xe155, "IBCR5B", 4, BcrSignal::CurrentB),
    bcr(0xe158, "TBCR5A", 4, BcrSignal::TemperatureA),
    bcr(0xe159, "TBCR5B", 4, BcrSignal::TemperatureB),
    bcr(0xe15c, "SDBCR5A", 4, BcrSignal::SunA),
    bcr(0xe15d, "SDBCR5B", 4, BcrSignal::SunB),
    pcm(0xe200, "VPCM3V3", PcmRail::Rail3V3, PowerSignal::Voltage),
    pcm(0xe204, "IPCM3V3", PcmRail::Rail3V3, PowerSignal::Current),
    pcm(0xe210, "VPCM5V", PcmRail::Rail5V, PowerSignal::Voltage),
    pcm(0xe214, "IPCM5V", PcmRail::Rail5V, PowerSignal::Current),
    pcm(0xe220, "VPCMBATV", PcmRail::Battery, PowerSignal::Voltage),
    pcm(0xe224, "IPCMBATV", PcmRail::Battery, PowerSignal::Current),
    pcm(0xe230, "VPCM12V", PcmRail::Rail12V, PowerSignal::Voltage),
    pcm(0xe234, "IPCM12V", PcmRail::Rail12V, PowerSignal::Current),
    switch(0xe410, "VSW1", 0, PowerSignal::Voltage),
    switch(0xe414, "ISW1", 0, PowerSignal::Current),
    switch(0xe420, "VSW2", 1, PowerSignal::Voltage),
    switch(0xe424, "ISW2", 1, PowerSignal::Current),
    switch(0xe430, "VSW3", 2, PowerSignal::Voltage),
    switch(0xe434, "ISW3", 2, PowerSignal::Current),
    switch(0xe440, "VSW4", 3, PowerSignal::Voltage),
    switch(0xe444, "ISW4", 3, PowerSignal::Current),
    switch(0xe450, "VSW5", 4, PowerSignal::Voltage),
    switch(0xe454, "ISW5", 4, PowerSignal::Current),
    switch(0xe460, "VSW6", 5, PowerSignal::Voltage),
    switch(0xe464, "ISW6", 5, PowerSignal::Current),
    switch(0xe470, "VSW7", 6, PowerSignal::Voltage),
    switch(0xe474, "ISW7", 6, PowerSignal::Current),
    switch(0xe480, "VSW8", 7, PowerSignal::Voltage),
    switch(0xe484, "ISW8", 7, PowerSignal::Current),
    switch(0xe490, "VSW9", 8, PowerSignal::Voltage),
    switch(0xe494, "ISW9", 8, PowerSignal::Current),
    switch(0xe4a0, "VSW10", 9, PowerSignal::Voltage),
    switch(0xe4a4, "ISW10", 9, PowerSignal::Current),
    board(0xe280, "VIDIODE", BoardSignal::DiodeVoltage),
    board(0xe284, "IIDIODE", BoardSignal::DiodeCurrent),
    board(0xe205, "I3V3_DRW", BoardSignal::Draw3V3),
    board(0xe215, "I5V_DRW", BoardSignal::Draw5V),
    board(0xe308, "TBRD", BoardSignal::Temperature),
];

/// Returns the full channel catalog in board order.
#[must_use]
pub const fn channels() -> &'static [ChannelInfo] {
    &CHANNELS
}

/// Finds the catalog entry for a code.
#[must_use]
pub fn lookup(code: ChannelCode) -> Option<&'static ChannelInfo> {
    CHANNELS.iter().find(|info| info.code == code)
}

/// Finds a channel by canonical name (case insensitive).
#[must_use]
pub fn find_by_name(name: &str) -> Option<&'static ChannelInfo> {
    CHANNELS
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
}
