use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Configuration values the instrument refuses.
///
/// Every enumerated option below is a closed set; the spellings are the
/// exact strings the WaveSurfer VBS interface accepts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'{value}' is not a valid option for {field}")]
    InvalidOption { field: &'static str, value: String },
}

/// The four acquisition channels of the WaveSurfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelId {
    C1,
    C2,
    C3,
    C4,
}

impl ChannelId {
    pub const ALL: [Self; 4] = [Self::C1, Self::C2, Self::C3, Self::C4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::C3 => "C3",
            Self::C4 => "C4",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C1" => Ok(Self::C1),
            "C2" => Ok(Self::C2),
            "C3" => Ok(Self::C3),
            "C4" => Ok(Self::C4),
            _ => Err(ConfigError::InvalidOption {
                field: "channel",
                value: s.to_string(),
            }),
        }
    }
}

/// Channel bandwidth limitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bandwidth {
    #[serde(rename = "Full")]
    Full,
    #[serde(rename = "20MHz")]
    Limit20Mhz,
}

impl Bandwidth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Limit20Mhz => "20MHz",
        }
    }
}

impl FromStr for Bandwidth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Full" => Ok(Self::Full),
            "20MHz" => Ok(Self::Limit20Mhz),
            _ => Err(ConfigError::InvalidOption {
                field: "bandwidth",
                value: s.to_string(),
            }),
        }
    }
}

/// Channel input coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coupling {
    #[serde(rename = "AC1M")]
    Ac1M,
    #[serde(rename = "DC1M")]
    Dc1M,
    #[serde(rename = "DC50")]
    Dc50,
    #[serde(rename = "Gnd")]
    Gnd,
}

impl Coupling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac1M => "AC1M",
            Self::Dc1M => "DC1M",
            Self::Dc50 => "DC50",
            Self::Gnd => "Gnd",
        }
    }
}

impl FromStr for Coupling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AC1M" => Ok(Self::Ac1M),
            "DC1M" => Ok(Self::Dc1M),
            "DC50" => Ok(Self::Dc50),
            "Gnd" => Ok(Self::Gnd),
            _ => Err(ConfigError::InvalidOption {
                field: "coupling",
                value: s.to_string(),
            }),
        }
    }
}

/// Enhanced-resolution digital filter (bits of averaging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnhanceRes {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "0.5bits")]
    HalfBit,
    #[serde(rename = "1bits")]
    OneBit,
    #[serde(rename = "1.5bits")]
    OneAndHalfBits,
    #[serde(rename = "2bits")]
    TwoBits,
    #[serde(rename = "2.5bits")]
    TwoAndHalfBits,
    #[serde(rename = "3bits")]
    ThreeBits,
}

impl EnhanceRes {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::HalfBit => "0.5bits",
            Self::OneBit => "1bits",
            Self::OneAndHalfBits => "1.5bits",
            Self::TwoBits => "2bits",
            Self::TwoAndHalfBits => "2.5bits",
            Self::ThreeBits => "3bits",
        }
    }
}

impl FromStr for EnhanceRes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "0.5bits" => Ok(Self::HalfBit),
            "1bits" => Ok(Self::OneBit),
            "1.5bits" => Ok(Self::OneAndHalfBits),
            "2bits" => Ok(Self::TwoBits),
            "2.5bits" => Ok(Self::TwoAndHalfBits),
            "3bits" => Ok(Self::ThreeBits),
            _ => Err(ConfigError::InvalidOption {
                field: "filter",
                value: s.to_string(),
            }),
        }
    }
}

/// Edge trigger slope selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEdge {
    Either,
    Negative,
    Positive,
    Window,
}

impl TriggerEdge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Either => "Either",
            Self::Negative => "Negative",
            Self::Positive => "Positive",
            Self::Window => "Window",
        }
    }
}

impl FromStr for TriggerEdge {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Either" => Ok(Self::Either),
            "Negative" => Ok(Self::Negative),
            "Positive" => Ok(Self::Positive),
            "Window" => Ok(Self::Window),
            _ => Err(ConfigError::InvalidOption {
                field: "trigger edge",
                value: s.to_string(),
            }),
        }
    }
}

/// Trigger path coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCoupling {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "HFREJ")]
    HighFreqReject,
    #[serde(rename = "LFREJ")]
    LowFreqReject,
}

impl TriggerCoupling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ac => "AC",
            Self::Dc => "DC",
            Self::HighFreqReject => "HFREJ",
            Self::LowFreqReject => "LFREJ",
        }
    }
}

impl FromStr for TriggerCoupling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AC" => Ok(Self::Ac),
            "DC" => Ok(Self::Dc),
            "HFREJ" => Ok(Self::HighFreqReject),
            "LFREJ" => Ok(Self::LowFreqReject),
            _ => Err(ConfigError::InvalidOption {
                field: "trigger coupling",
                value: s.to_string(),
            }),
        }
    }
}

/// Timebase and sample-storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimebaseConfig {
    /// Seconds per division.
    pub div: f64,
    /// Horizontal offset origin, in divisions.
    pub offset_origin: f64,
    /// Horizontal offset, in seconds.
    pub offset: f64,
    /// Maximum number of samples to store.
    pub max_samples: f64,
}

/// Per-channel acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub bandwidth: Bandwidth,
    pub coupling: Coupling,
    pub filter: EnhanceRes,
    pub invert: bool,
    /// Deskew, in seconds.
    pub skew: f64,
    /// Probe attenuation factor.
    pub attenuation: f64,
    /// Volts per division.
    pub div: f64,
    /// Vertical offset, in volts.
    pub offset: f64,
}

/// Edge trigger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// The channel the trigger listens on.
    pub channel: ChannelId,
    pub edge: TriggerEdge,
    pub coupling: TriggerCoupling,
    /// Trigger level, in volts.
    pub level: f64,
    /// Window size for window triggers, in volts.
    pub window: f64,
}

/// Complete acquisition setup: timebase, channels, and trigger.
///
/// Channels are keyed by [`ChannelId`] in a `BTreeMap` so the configuration
/// command stream is emitted in a deterministic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub time: TimebaseConfig,
    pub channel: BTreeMap<ChannelId, ChannelConfig>,
    pub trigger: TriggerSettings,
}
