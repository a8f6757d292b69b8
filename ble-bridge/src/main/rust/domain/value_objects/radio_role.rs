use std::fmt;

/// The two independent BLE roles the bridge drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioRole {
    /// Observer: receives advertisements from nearby devices
    Central,
    /// Broadcaster: emits the bridge's own advertisements
    Peripheral,
}

impl fmt::Display for RadioRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Central => write!(f, "central"),
            Self::Peripheral => write!(f, "peripheral"),
        }
    }
}

/// Radio power/availability as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Unknown,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::PoweredOff => write!(f, "poweredOff"),
            Self::PoweredOn => write!(f, "poweredOn"),
        }
    }
}

impl Default for AdapterState {
    fn default() -> Self {
        Self::Unknown
    }
}
