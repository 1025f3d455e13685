//! JSON configuration for the emulator host.
//!
//! Every key is optional; a missing file section falls back to a board with
//! no daughterboard, zeroed versions and all switches off.
//!
//! ```json
//! {
//!   "log_level": "info",
//!   "swap_bytes": { "in": false, "out": false },
//!   "tick_ms": 100,
//!   "eps": {
//!     "address": 43,
//!     "version": { "firmware": 2748, "revision": 1 },
//!     "daughterboard": { "connected": false, "firmware": 0, "revision": 0 },
//!     "switch": [false, false, false, false, false, false, false, false, false, false],
//!     "tlm": { "e110": { "value": 20.25, "adc": [0.0249, 0.0] } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use eps_core::SimTime;
use eps_core::channel::ChannelCode;
use eps_core::console::executor::DEFAULT_TICK_MS;
use eps_core::eps::{Eps, EpsConfig, NUM_SWITCHES};
use eps_core::events::EventSink;
use eps_core::protocol::ByteSwap;
use eps_core::version::Version;
use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

const DEFAULT_ADDRESS: u8 = 0x2b;
const MAX_ADC_PARAMS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("telemetry key `{0}` is not a hexadecimal channel code")]
    InvalidChannelCode(String),
    #[error("channel {key} takes at most 2 converter parameters, got {count}")]
    InvalidAdcParams { key: String, count: usize },
    #[error("unknown log level `{0}` (expected trace, debug, info, warn or error)")]
    InvalidLogLevel(String),
    #[error("expected 10 switch states, got {0}")]
    SwitchCount(usize),
}

/// Top-level configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub log_level: Option<String>,
    pub swap_bytes: SwapBytes,
    pub tick_ms: Option<SimTime>,
    pub eps: BoardConfig,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SwapBytes {
    #[serde(rename = "in")]
    pub input: bool,
    #[serde(rename = "out")]
    pub output: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub address: u8,
    pub version: VersionConfig,
    pub daughterboard: DaughterboardConfig,
    /// Commanded state per switch, first entry is switch 1.
    pub switch: Vec<bool>,
    /// Keyed by hexadecimal channel code (`"e110"`).
    pub tlm: BTreeMap<String, ChannelConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            version: VersionConfig::default(),
            daughterboard: DaughterboardConfig::default(),
            switch: Vec::new(),
            tlm: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionConfig {
    pub firmware: u16,
    pub revision: u8,
}

impl VersionConfig {
    fn version(self) -> Version {
        Version::new(self.firmware, self.revision)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaughterboardConfig {
    pub connected: bool,
    pub firmware: u16,
    pub revision: u8,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub value: Option<f64>,
    pub adc: Vec<f64>,
}

impl EmulatorConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        self.channels()?;
        let switches = self.eps.switch.len();
        if switches != 0 && switches != NUM_SWITCHES {
            return Err(ConfigError::SwitchCount(switches));
        }
        Ok(())
    }

    /// Maximum tracing level, `error` when unset.
    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .as_deref()
            .map_or(Ok(Level::ERROR), parse_log_level)
    }

    #[must_use]
    pub fn tick_ms(&self) -> SimTime {
        self.tick_ms.unwrap_or(DEFAULT_TICK_MS)
    }

    /// Construction parameters for the board.
    #[must_use]
    pub fn eps_config(&self) -> EpsConfig {
        EpsConfig {
            address: self.eps.address,
            daughterboard: self.eps.daughterboard.connected,
            swap: ByteSwap::new(self.swap_bytes.input, self.swap_bytes.output),
        }
    }

    /// Copies versions, telemetry and switch states onto a freshly built board.
    pub fn apply<S: EventSink>(&self, eps: &mut Eps<S>) -> Result<(), ConfigError> {
        let channels = self.channels()?;

        eps.set_version(self.eps.version.version());
        let daughterboard = self.eps.daughterboard;
        eps.set_daughterboard_version(Version::new(daughterboard.firmware, daughterboard.revision));

        // Unknown codes are reported by the board itself and otherwise skipped.
        for (code, channel) in &channels {
            if let Some(value) = channel.value {
                let _ = eps.set_telemetry(*code, value);
            }
        }
        for (code, channel) in &channels {
            if !channel.adc.is_empty() {
                let _ = eps.configure_channel(*code, &channel.adc);
            }
        }

        for (index, on) in self.eps.switch.iter().enumerate() {
            eps.set_switch_state(index, *on)
                .map_err(|_| ConfigError::SwitchCount(self.eps.switch.len()))?;
        }
        Ok(())
    }

    fn channels(&self) -> Result<Vec<(ChannelCode, &ChannelConfig)>, ConfigError> {
        self.eps
            .tlm
            .iter()
            .map(|(key, channel)| {
                let code = parse_channel_code(key)?;
                if channel.adc.len() > MAX_ADC_PARAMS {
                    return Err(ConfigError::InvalidAdcParams {
                        key: key.clone(),
                        count: channel.adc.len(),
                    });
                }
                Ok((code, channel))
            })
            .collect()
    }
}

/// Accepts the level names understood by `--log-level`.
pub fn parse_log_level(text: &str) -> Result<Level, ConfigError> {
    Level::from_str(text.trim()).map_err(|_| ConfigError::InvalidLogLevel(text.to_string()))
}

fn parse_channel_code(key: &str) -> Result<ChannelCode, ConfigError> {
    let digits = key
        .strip_prefix("0x")
        .or_else(|| key.strip_prefix("0X"))
        .unwrap_or(key);
    u16::from_str_radix(digits, 16)
        .map(ChannelCode::new)
        .map_err(|_| ConfigError::InvalidChannelCode(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eps_core::events::NoopEventSink;

    const SAMPLE: &str = r#"{
        "log_level": "info",
        "swap_bytes": { "in": true, "out": false },
        "tick_ms": 250,
        "eps": {
            "address": 44,
            "version": { "firmware": 2748, "revision": 1 },
            "daughterboard": { "connected": true, "firmware": 16, "revision": 2 },
            "switch": [true, false, false, true, false, false, false, false, false, false],
            "tlm": {
                "e110": { "value": 20.25, "adc": [0.0249, 0.0] },
                "0xe308": { "value": 12.0 }
            }
        }
    }"#;

    fn board(config: &EmulatorConfig) -> Eps<NoopEventSink> {
        let mut eps = Eps::new(config.eps_config());
        config.apply(&mut eps).expect("config applies");
        eps
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = EmulatorConfig::from_json("{}").expect("parses");
        assert_eq!(config.log_level().expect("level"), Level::ERROR);
        assert_eq!(config.tick_ms(), DEFAULT_TICK_MS);
        let eps_config = config.eps_config();
        assert_eq!(eps_config.address, DEFAULT_ADDRESS);
        assert!(!eps_config.daughterboard);
        assert_eq!(eps_config.swap, ByteSwap::new(false, false));
    }

    #[test]
    fn sample_document_configures_board() {
        let config = EmulatorConfig::from_json(SAMPLE).expect("parses");
        assert_eq!(config.log_level().expect("level"), Level::INFO);
        assert_eq!(config.tick_ms(), 250);
        assert_eq!(config.eps_config().swap, ByteSwap::new(true, false));

        let eps = board(&config);
        assert_eq!(eps.address(), 44);
        assert!(eps.has_daughterboard());
        assert_eq!(eps.version(), Version::new(2748, 1));
        assert_eq!(eps.daughterboard_version(), Version::new(16, 2));
        assert_eq!(eps.switch_state(0), Ok(true));
        assert_eq!(eps.switch_state(1), Ok(false));
        assert_eq!(eps.switch_state(3), Ok(true));

        let tbrd = eps.telemetry(ChannelCode::TBRD).expect("known channel");
        assert_eq!(tbrd.raw, 12);
        let vbcr1 = eps.telemetry(ChannelCode::VBCR1).expect("known channel");
        assert_eq!(vbcr1.raw, 813);
    }

    #[test]
    fn unknown_channel_codes_are_skipped() {
        let config = EmulatorConfig::from_json(r#"{"eps": {"tlm": {"1234": {"value": 1.0}}}}"#)
            .expect("parses");
        let eps = board(&config);
        assert!(eps.telemetry(ChannelCode::new(0x1234)).is_err());
    }

    #[test]
    fn rejects_non_hex_channel_key() {
        match EmulatorConfig::from_json(r#"{"eps": {"tlm": {"VBCR1": {"value": 1.0}}}}"#) {
            Err(ConfigError::InvalidChannelCode(key)) => assert_eq!(key, "VBCR1"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_long_adc_lists() {
        match EmulatorConfig::from_json(r#"{"eps": {"tlm": {"e110": {"adc": [1.0, 2.0, 3.0]}}}}"#) {
            Err(ConfigError::InvalidAdcParams { key, count }) => {
                assert_eq!(key, "e110");
                assert_eq!(count, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_short_switch_array() {
        match EmulatorConfig::from_json(r#"{"eps": {"switch": [true, false]}}"#) {
            Err(ConfigError::SwitchCount(2)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_log_level() {
        match EmulatorConfig::from_json(r#"{"log_level": "chatty"}"#) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "chatty"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(parse_log_level("WARN").expect("level"), Level::WARN);
    }

    #[test]
    fn malformed_json_is_reported() {
        match EmulatorConfig::from_json("{") {
            Err(ConfigError::Json(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
