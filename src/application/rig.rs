// Sensor rig - the configured channel topology and its adapters
use crate::application::sensors::{BusOpener, InertialSensor, PowerMonitor};
use crate::domain::channel::ChannelKind;
use std::sync::Arc;

pub enum RigSource {
    Power(Box<dyn PowerMonitor>),
    Inertial(Box<dyn InertialSensor>),
    /// Buses are opened per session through the rig's `BusOpener`
    Bus { interface: String },
}

pub struct RigChannel {
    pub id: String,
    /// Log file name inside the storage directory
    pub file: String,
    pub source: RigSource,
}

impl RigChannel {
    pub fn new(id: impl Into<String>, file: impl Into<String>, source: RigSource) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            source,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self.source {
            RigSource::Power(_) => ChannelKind::Power,
            RigSource::Inertial(_) => ChannelKind::Inertial,
            RigSource::Bus { .. } => ChannelKind::Bus,
        }
    }
}

/// Channels in sampling order plus the opener for their buses.
///
/// Power and inertial adapters live for the whole process; the rig is handed
/// to the sampling loop for a session and handed back when it drains.
pub struct Rig {
    channels: Vec<RigChannel>,
    buses: Arc<dyn BusOpener>,
}

impl Rig {
    pub fn new(channels: Vec<RigChannel>, buses: Arc<dyn BusOpener>) -> Self {
        Self { channels, buses }
    }

    #[cfg(test)]
    pub fn channels(&self) -> &[RigChannel] {
        &self.channels
    }

    /// Channels and bus opener borrowed together for session entry
    pub fn parts_mut(&mut self) -> (&mut [RigChannel], &dyn BusOpener) {
        (&mut self.channels, self.buses.as_ref())
    }

    /// Power monitors in sampling order
    pub fn power_monitors_mut(&mut self) -> impl Iterator<Item = (&str, &mut Box<dyn PowerMonitor>)> {
        self.channels.iter_mut().filter_map(|channel| match &mut channel.source {
            RigSource::Power(monitor) => Some((channel.id.as_str(), monitor)),
            _ => None,
        })
    }
}
