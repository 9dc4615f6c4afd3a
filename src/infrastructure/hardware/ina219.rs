// INA219 high-side power monitor - register driver over embedded-hal I2C
use super::i2c_error;
use crate::application::sensors::{PowerMonitor, SensorError};
use crate::domain::sample::PowerReading;
use embedded_hal::i2c::I2c;

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

const BUS_RANGE_16V: u16 = 0x0000;
const GAIN_8_320MV: u16 = 0x1800;
const BUS_ADC_12BIT_32S: u16 = 0x0D << 7;
const SHUNT_ADC_12BIT_32S: u16 = 0x0D << 3;
const MODE_SHUNT_BUS_CONTINUOUS: u16 = 0x0007;

/// 16 V bus range, /8 gain (±320 mV shunt), 12-bit 32-sample averaging on
/// both ADCs, continuous shunt + bus conversion
pub const CONFIG: u16 =
    BUS_RANGE_16V | GAIN_8_320MV | BUS_ADC_12BIT_32S | SHUNT_ADC_12BIT_32S | MODE_SHUNT_BUS_CONTINUOUS;
/// 0.1 mA current LSB and 2 mW power LSB with a 0.1 Ω shunt
pub const CALIBRATION: u16 = 4096;

const SHUNT_LSB_V: f64 = 0.000_01;
const BUS_LSB_V: f64 = 0.004;
const CURRENT_LSB_MA: f64 = 0.1;
const POWER_LSB_W: f64 = 0.002;

pub struct Ina219<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ina219<I> {
    pub fn new(i2c: I, address: u8) -> Result<Self, SensorError> {
        let mut device = Self { i2c, address };
        device.write_register(REG_CALIBRATION, CALIBRATION)?;
        device.write_register(REG_CONFIG, CONFIG)?;
        Ok(device)
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), SensorError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, hi, lo])
            .map_err(|e| i2c_error(self.address, e))
    }

    fn read_register(&mut self, register: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| i2c_error(self.address, e))?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<I: I2c + Send> PowerMonitor for Ina219<I> {
    fn read(&mut self) -> Result<PowerReading, SensorError> {
        let shunt = self.read_register(REG_SHUNT_VOLTAGE)? as i16;
        let bus = self.read_register(REG_BUS_VOLTAGE)? >> 3;
        let power = self.read_register(REG_POWER)?;
        let current = self.read_register(REG_CURRENT)? as i16;

        Ok(PowerReading {
            bus_voltage: f64::from(bus) * BUS_LSB_V,
            shunt_voltage: f64::from(shunt) * SHUNT_LSB_V,
            power: f64::from(power) * POWER_LSB_W,
            current_ma: f64::from(current) * CURRENT_LSB_MA,
        })
    }
}
