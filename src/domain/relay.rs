// Relay domain model
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One-based relay channel number, rendered as `CH<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelayChannel(u8);

impl RelayChannel {
    pub fn new(number: u8) -> Self {
        Self(number)
    }
}

impl fmt::Display for RelayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// Last commanded relay position. `Unknown` until the first command after start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    On,
    Off,
    Unknown,
}

impl RelayState {
    /// GPIO level driving the relay into this state
    pub fn level(&self, active_low: bool) -> Option<u8> {
        match (self, active_low) {
            (RelayState::On, true) | (RelayState::Off, false) => Some(0),
            (RelayState::Off, true) | (RelayState::On, false) => Some(1),
            (RelayState::Unknown, _) => None,
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::On => "ON",
            RelayState::Off => "OFF",
            RelayState::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

impl FromStr for RelayState {
    type Err = String;

    /// Only commandable states parse; case is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ON" => Ok(RelayState::On),
            "OFF" => Ok(RelayState::Off),
            other => Err(other.to_string()),
        }
    }
}
