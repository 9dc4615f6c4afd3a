// Builds the sensor rig from the configured channel topology
use crate::application::rig::{Rig, RigChannel, RigSource};
use crate::application::sensors::{BusOpener, InertialSensor, PowerMonitor, SensorError};
use crate::domain::channel::ChannelKind;
use crate::infrastructure::config::{Backend, ChannelConfig, RigConfig};
use crate::infrastructure::simulated::{
    SimulatedBusOpener, SimulatedInertialSensor, SimulatedPowerMonitor,
};
use anyhow::{Context, bail};
use std::sync::Arc;

/// Adapter factory for one backend
trait DeviceFactory {
    fn power_monitor(&self, address: u8) -> Result<Box<dyn PowerMonitor>, SensorError>;
    fn inertial_sensor(&self, address: u8) -> Result<Box<dyn InertialSensor>, SensorError>;
    fn bus_opener(&self) -> Arc<dyn BusOpener>;
}

struct Simulated;

impl DeviceFactory for Simulated {
    fn power_monitor(&self, address: u8) -> Result<Box<dyn PowerMonitor>, SensorError> {
        Ok(Box::new(SimulatedPowerMonitor::new(address)))
    }

    fn inertial_sensor(&self, _address: u8) -> Result<Box<dyn InertialSensor>, SensorError> {
        Ok(Box::new(SimulatedInertialSensor::default()))
    }

    fn bus_opener(&self) -> Arc<dyn BusOpener> {
        Arc::new(SimulatedBusOpener)
    }
}

#[cfg(feature = "hardware")]
struct Hardware {
    i2c_bus: std::path::PathBuf,
}

#[cfg(feature = "hardware")]
impl DeviceFactory for Hardware {
    fn power_monitor(&self, address: u8) -> Result<Box<dyn PowerMonitor>, SensorError> {
        super::hardware::linux::power_monitor(&self.i2c_bus, address)
    }

    fn inertial_sensor(&self, address: u8) -> Result<Box<dyn InertialSensor>, SensorError> {
        super::hardware::linux::inertial_sensor(&self.i2c_bus, address)
    }

    fn bus_opener(&self) -> Arc<dyn BusOpener> {
        Arc::new(super::hardware::socketcan_bus::SocketCanOpener)
    }
}

/// Initializes every power and inertial device once. Buses are only named here;
/// they are opened per collection session.
pub fn build_rig(config: &RigConfig) -> anyhow::Result<Rig> {
    match config.rig.backend {
        Backend::Simulated => assemble(&Simulated, &config.channels),
        #[cfg(feature = "hardware")]
        Backend::Hardware => assemble(
            &Hardware {
                i2c_bus: config.rig.i2c_bus.clone(),
            },
            &config.channels,
        ),
        #[cfg(not(feature = "hardware"))]
        Backend::Hardware => {
            bail!("hardware backend requested but rigd was built without it; rebuild with --features hardware")
        }
    }
}

fn assemble(factory: &dyn DeviceFactory, channels: &[ChannelConfig]) -> anyhow::Result<Rig> {
    let mut rig_channels = Vec::with_capacity(channels.len());
    for channel in channels {
        let source = match channel.kind {
            ChannelKind::Power => RigSource::Power(
                factory
                    .power_monitor(address(channel)?)
                    .with_context(|| format!("initializing {}", channel.id))?,
            ),
            ChannelKind::Inertial => RigSource::Inertial(
                factory
                    .inertial_sensor(address(channel)?)
                    .with_context(|| format!("initializing {}", channel.id))?,
            ),
            ChannelKind::Bus => {
                let Some(interface) = channel.interface.clone() else {
                    bail!("bus channel {} needs an interface", channel.id);
                };
                RigSource::Bus { interface }
            }
        };
        tracing::debug!("Channel {} ({}) -> {}", channel.id, channel.kind, channel.file);
        rig_channels.push(RigChannel::new(&channel.id, &channel.file, source));
    }
    Ok(Rig::new(rig_channels, factory.bus_opener()))
}

fn address(channel: &ChannelConfig) -> anyhow::Result<u8> {
    channel
        .address
        .with_context(|| format!("{} channel {} needs an address", channel.kind, channel.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_rig_follows_config_order() {
        let config = RigConfig::default();
        let rig = build_rig(&config).unwrap();

        let layout: Vec<(&str, ChannelKind)> = rig
            .channels()
            .iter()
            .map(|c| (c.file.as_str(), c.kind()))
            .collect();
        assert_eq!(
            layout,
            [
                ("channel_1.csv", ChannelKind::Power),
                ("channel_2.csv", ChannelKind::Power),
                ("channel_3.csv", ChannelKind::Power),
                ("mpu6050.csv", ChannelKind::Inertial),
                ("can0.csv", ChannelKind::Bus),
                ("can1.csv", ChannelKind::Bus),
            ]
        );
    }

    #[test]
    fn test_missing_address_is_rejected() {
        let mut config = RigConfig::default();
        config.channels[3].address = None;
        let err = build_rig(&config).err().unwrap();
        assert!(err.to_string().contains("mpu6050"));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_hardware_backend_needs_feature() {
        let mut config = RigConfig::default();
        config.rig.backend = Backend::Hardware;
        let err = build_rig(&config).err().unwrap();
        assert!(err.to_string().contains("--features hardware"));
    }
}
