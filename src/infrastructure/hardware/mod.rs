// Hardware adapters: register drivers over embedded-hal I2C plus the Linux transports
pub mod ina219;
#[cfg(feature = "hardware")]
pub mod linux;
pub mod mpu6050;
#[cfg(feature = "hardware")]
pub mod socketcan_bus;

use crate::application::sensors::SensorError;

pub(crate) fn i2c_error<E: embedded_hal::i2c::Error>(address: u8, error: E) -> SensorError {
    SensorError::Transfer(format!("i2c device 0x{address:02x}: {:?}", error.kind()))
}
