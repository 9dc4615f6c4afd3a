// MPU-6050 accelerometer/gyroscope at power-on ranges (±2 g, ±250 °/s)
use super::i2c_error;
use crate::application::sensors::{InertialSensor, SensorError};
use crate::domain::sample::{Axes, InertialReading};
use embedded_hal::i2c::I2c;

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_ACCEL_XOUT_H: u8 = 0x3B;

const ACCEL_LSB_PER_G: f64 = 16384.0;
const GYRO_LSB_PER_DPS: f64 = 131.0;
const STANDARD_GRAVITY: f64 = 9.80665;

pub struct Mpu6050<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Mpu6050<I> {
    /// Wakes the device out of sleep
    pub fn new(mut i2c: I, address: u8) -> Result<Self, SensorError> {
        i2c.write(address, &[REG_PWR_MGMT_1, 0x00])
            .map_err(|e| i2c_error(address, e))?;
        Ok(Self { i2c, address })
    }
}

impl<I: I2c + Send> InertialSensor for Mpu6050<I> {
    /// One burst read of accel, temperature and gyro registers
    fn read(&mut self) -> Result<InertialReading, SensorError> {
        let mut buf = [0u8; 14];
        self.i2c
            .write_read(self.address, &[REG_ACCEL_XOUT_H], &mut buf)
            .map_err(|e| i2c_error(self.address, e))?;

        let word = |i: usize| f64::from(i16::from_be_bytes([buf[i], buf[i + 1]]));
        let accel = |i: usize| word(i) / ACCEL_LSB_PER_G * STANDARD_GRAVITY;
        let gyro = |i: usize| word(i) / GYRO_LSB_PER_DPS;

        Ok(InertialReading {
            accel: Axes::new(accel(0), accel(2), accel(4)),
            gyro: Axes::new(gyro(8), gyro(10), gyro(12)),
            temperature: word(6) / 340.0 + 36.53,
        })
    }
}
