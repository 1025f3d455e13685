//! Analog telemetry channels and their digitizing converters.
//!
//! Each [`Channel`] stores an analog value and reports it through a
//! [`Converter`] as an n-bit count. Channels owned by a bus are deactivated
//! while that bus is in reset; the stored value survives the reset cycle.

pub mod registry;

use core::fmt;

pub use registry::{
    BcrSignal, BoardSignal, ChannelCode, ChannelInfo, ChannelSlot, PowerSignal, channels, lookup,
};

/// Default ADC resolution for every board channel.
pub const DEFAULT_RESOLUTION_BITS: u8 = 10;

/// Converter used to digitize a channel's analog value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Converter {
    /// `count = round((value - offset) / scale)`.
    Linear { scale: f64, offset: f64 },
    /// `count = value` truncated to an integer.
    Threshold,
}

impl Converter {
    /// Identity linear conversion.
    pub const IDENTITY: Converter = Converter::Linear {
        scale: 1.0,
        offset: 0.0,
    };
}

impl Default for Converter {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Digitized and analog reading of a channel.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ChannelTelemetry {
    pub raw: u16,
    pub value: f64,
}

impl fmt::Display for ChannelTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "raw=0x{:04x} value={}", self.raw, self.value)
    }
}

/// Single analog telemetry point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Channel {
    resolution: u8,
    converter: Converter,
    active: bool,
    value: f64,
}

impl Channel {
    /// Active 10-bit channel with a zero value.
    #[must_use]
    pub const fn new(converter: Converter) -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION_BITS,
            converter,
            active: true,
            value: 0.0,
        }
    }

    #[must_use]
    pub const fn linear() -> Self {
        Self::new(Converter::IDENTITY)
    }

    #[must_use]
    pub const fn threshold() -> Self {
        Self::new(Converter::Threshold)
    }

    /// Overrides the converter resolution, clamped to 16 bits.
    #[must_use]
    pub const fn with_resolution(mut self, bits: u8) -> Self {
        self.resolution = if bits > 16 { 16 } else { bits };
        self
    }

    /// Applies converter coefficients `[scale, offset]`.
    ///
    /// Missing coefficients fall back to the identity (`scale = 1`, `offset = 0`)
    /// and extra ones are ignored. Threshold channels keep their converter.
    pub fn configure(&mut self, params: &[f64]) {
        if let Converter::Linear { scale, offset } = &mut self.converter {
            *scale = params.first().copied().unwrap_or(1.0);
            *offset = params.get(1).copied().unwrap_or(0.0);
        }
    }

    #[must_use]
    pub const fn converter(&self) -> Converter {
        self.converter
    }

    #[must_use]
    pub const fn resolution(&self) -> u8 {
        self.resolution
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Analog value as observed on the bus; 0.0 while inactive.
    #[must_use]
    pub fn value(&self) -> f64 {
        if self.active { self.value } else { 0.0 }
    }

    /// Stored value regardless of activation.
    #[must_use]
    pub const fn stored_value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    #[must_use]
    pub const fn max_count(&self) -> u16 {
        if self.resolution >= 16 {
            u16::MAX
        } else {
            (1u16 << self.resolution) - 1
        }
    }

    /// Digitized count, masked to the channel resolution; 0 while inactive.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self) -> u16 {
        if !self.active {
            return 0;
        }

        match self.converter {
            Converter::Linear { scale, offset } => {
                let count = (self.value - offset) / (scale + f64::MIN_POSITIVE) + 0.5;
                if count >= 0.0 {
                    ((count as u64) & u64::from(self.max_count())) as u16
                } else {
                    0
                }
            }
            Converter::Threshold => (self.value as u16) & self.max_count(),
        }
    }

    #[must_use]
    pub fn telemetry(&self) -> ChannelTelemetry {
        ChannelTelemetry {
            raw: self.sample(),
            value: self.value(),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::linear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_sample_rounds_to_nearest_count() {
        let mut channel = Channel::linear();
        channel.configure(&[0.0249, 0.0]);
        channel.set_value(20.25);
        assert_eq!(channel.sample(), 813);
    }

    #[test]
    fn linear_sample_masks_to_resolution() {
        let mut channel = Channel::linear();
        channel.set_value(1024.0);
        assert_eq!(channel.sample(), 0);
        channel.set_value(1023.0);
        assert_eq!(channel.sample(), 1023);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let mut channel = Channel::linear();
        channel.configure(&[1.0, 10.0]);
        channel.set_value(2.0);
        assert_eq!(channel.sample(), 0);
    }

    #[test]
    fn threshold_truncates_value() {
        let mut channel = Channel::threshold();
        channel.set_value(775.9);
        assert_eq!(channel.sample(), 775);
        channel.configure(&[2.0, 3.0]);
        assert_eq!(channel.converter(), Converter::Threshold);
        assert_eq!(channel.sample(), 775);
    }

    #[test]
    fn missing_coefficients_fall_back_to_identity() {
        let mut channel = Channel::linear();
        channel.configure(&[2.0]);
        assert_eq!(
            channel.converter(),
            Converter::Linear {
                scale: 2.0,
                offset: 0.0
            }
        );
        channel.configure(&[]);
        assert_eq!(channel.converter(), Converter::IDENTITY);
    }

    #[test]
    fn inactive_channel_reports_zero_but_keeps_value() {
        let mut channel = Channel::linear();
        channel.set_value(12.0);
        channel.set_active(false);
        assert_eq!(channel.sample(), 0);
        assert!(channel.value().abs() < f64::EPSILON);
        assert!((channel.stored_value() - 12.0).abs() < f64::EPSILON);

        channel.set_active(true);
        assert_eq!(channel.sample(), 12);
    }
}
