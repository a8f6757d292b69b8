use std::fmt;

use super::AdvertisingConfig;

/// The bridge's own advertising role (pure domain)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertisingState {
    /// Not advertising
    Idle,
    /// Advertising with exactly one active configuration
    Advertising(AdvertisingConfig),
}

impl fmt::Display for AdvertisingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Advertising(config) => write!(f, "ADVERTISING ({})", config.name()),
        }
    }
}

impl AdvertisingState {
    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Advertising(_) => 1,
        }
    }

    /// Lowercase label used in JSON reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Advertising(_) => "advertising",
        }
    }

    pub fn is_advertising(&self) -> bool {
        matches!(self, Self::Advertising(_))
    }

    pub fn active_config(&self) -> Option<&AdvertisingConfig> {
        match self {
            Self::Advertising(config) => Some(config),
            Self::Idle => None,
        }
    }
}

impl Default for AdvertisingState {
    fn default() -> Self {
        Self::Idle
    }
}
