// Sensor adapter traits for the hardware sources polled by the sampling loop
use crate::domain::sample::{InertialReading, PowerReading, RawFrame};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// Power monitor reporting bus/shunt voltage, power and current.
///
/// Device configuration happens once when the adapter is built; `read` only
/// performs the register transfers.
pub trait PowerMonitor: Send {
    fn read(&mut self) -> Result<PowerReading, SensorError>;
}

/// Inertial sensor reporting acceleration, rotation rate and die temperature
pub trait InertialSensor: Send {
    fn read(&mut self) -> Result<InertialReading, SensorError>;
}

/// Outcome of one best-effort receive on a bus
#[derive(Debug)]
pub enum BusReceive {
    Frame(RawFrame),
    /// Timeout elapsed with no pending frame
    Empty,
    TransportError(SensorError),
}

/// An open bus, owned by one session
pub trait BusTransport: Send {
    /// Waits at most `timeout` for a frame.
    fn receive(&mut self, timeout: Duration) -> BusReceive;

    /// Releases the underlying socket. Called exactly once per opened transport.
    fn shutdown(&mut self) {}
}

/// Opens bus transports by interface name at session entry
pub trait BusOpener: Send + Sync {
    fn open(&self, interface: &str) -> Result<Box<dyn BusTransport>, SensorError>;
}
