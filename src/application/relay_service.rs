// Relay service - Validates relay commands and drives the GPIO lines
use crate::domain::relay::{RelayChannel, RelayState};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Output line writer for relay actuation
pub trait GpioPort: Send + Sync {
    fn write(&self, pin: u32, level: u8) -> std::io::Result<()>;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid channel: {channel}. Valid channels: {valid}.")]
    InvalidChannel { channel: String, valid: String },

    #[error("Invalid state: {0}. Valid states: ON, OFF.")]
    InvalidAction(String),

    #[error("An unexpected error occurred: {0}")]
    Actuation(#[source] std::io::Error),
}

#[derive(Clone)]
pub struct RelayService {
    pins: Arc<BTreeMap<RelayChannel, u32>>,
    states: Arc<Mutex<BTreeMap<RelayChannel, RelayState>>>,
    gpio: Arc<dyn GpioPort>,
    active_low: bool,
}

impl RelayService {
    pub fn new(pins: BTreeMap<RelayChannel, u32>, gpio: Arc<dyn GpioPort>, active_low: bool) -> Self {
        let states = pins
            .keys()
            .map(|channel| (*channel, RelayState::Unknown))
            .collect();
        Self {
            pins: Arc::new(pins),
            states: Arc::new(Mutex::new(states)),
            gpio,
            active_low,
        }
    }

    /// Sets relay `channel` (its number, e.g. "2") to `action` ("ON"/"OFF").
    ///
    /// Both inputs are validated before any GPIO write. The cached state only
    /// changes when the write succeeds.
    pub async fn set(&self, channel: &str, action: &str) -> Result<(RelayChannel, RelayState), RelayError> {
        let channel = self.resolve(channel)?;
        let state = action
            .parse::<RelayState>()
            .map_err(RelayError::InvalidAction)?;
        let (Some(pin), Some(level)) = (self.pins.get(&channel).copied(), state.level(self.active_low)) else {
            return Err(RelayError::InvalidAction(state.to_string()));
        };

        let gpio = Arc::clone(&self.gpio);
        tokio::task::spawn_blocking(move || gpio.write(pin, level))
            .await
            .map_err(|e| RelayError::Actuation(std::io::Error::other(e)))?
            .map_err(RelayError::Actuation)?;

        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, state);
        tracing::info!("Relay {} {}", channel, state);
        Ok((channel, state))
    }

    /// Last commanded state per channel
    pub fn states(&self) -> BTreeMap<RelayChannel, RelayState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolve(&self, raw: &str) -> Result<RelayChannel, RelayError> {
        raw.parse::<u8>()
            .ok()
            .map(RelayChannel::new)
            .filter(|channel| self.pins.contains_key(channel))
            .ok_or_else(|| RelayError::InvalidChannel {
                channel: format!("CH{raw}"),
                valid: self
                    .pins
                    .keys()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
