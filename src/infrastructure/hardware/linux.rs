// Linux I2C character-device adapters
use super::ina219::Ina219;
use super::mpu6050::Mpu6050;
use crate::application::sensors::{InertialSensor, PowerMonitor, SensorError};
use linux_embedded_hal::I2cdev;
use std::path::Path;

/// Each sensor gets its own handle on the shared bus; the kernel serializes transfers.
fn open_bus(bus: &Path) -> Result<I2cdev, SensorError> {
    I2cdev::new(bus).map_err(|e| SensorError::Unavailable(format!("{}: {}", bus.display(), e)))
}

pub fn power_monitor(bus: &Path, address: u8) -> Result<Box<dyn PowerMonitor>, SensorError> {
    Ok(Box::new(Ina219::new(open_bus(bus)?, address)?))
}

pub fn inertial_sensor(bus: &Path, address: u8) -> Result<Box<dyn InertialSensor>, SensorError> {
    Ok(Box::new(Mpu6050::new(open_bus(bus)?, address)?))
}
