// Simulated rig adapters for bench runs without the acquisition board
use crate::application::sensors::{
    BusOpener, BusReceive, BusTransport, InertialSensor, PowerMonitor, SensorError,
};
use crate::domain::sample::{Axes, InertialReading, PowerReading, RawFrame};
use std::time::Duration;

const STANDARD_GRAVITY: f64 = 9.80665;
const SHUNT_OHMS: f64 = 0.1;

/// Slow sine wobble around a rail voltage picked from the device address
pub struct SimulatedPowerMonitor {
    rail: f64,
    step: u64,
}

impl SimulatedPowerMonitor {
    pub fn new(address: u8) -> Self {
        let rail = match address {
            0x40 => 12.0,
            0x41 => 5.0,
            0x42 => 3.3,
            other => f64::from(other) / 10.0,
        };
        Self { rail, step: 0 }
    }
}

impl PowerMonitor for SimulatedPowerMonitor {
    fn read(&mut self) -> Result<PowerReading, SensorError> {
        self.step += 1;
        let phase = self.step as f64 * 0.1;
        let bus_voltage = self.rail + 0.05 * phase.sin();
        let shunt_voltage = 0.002 + 0.0005 * phase.cos();
        let current_ma = shunt_voltage / SHUNT_OHMS * 1000.0;

        Ok(PowerReading {
            bus_voltage,
            shunt_voltage,
            power: bus_voltage * current_ma / 1000.0,
            current_ma,
        })
    }
}

/// Level board with a little vibration
#[derive(Default)]
pub struct SimulatedInertialSensor {
    step: u64,
}

impl InertialSensor for SimulatedInertialSensor {
    fn read(&mut self) -> Result<InertialReading, SensorError> {
        self.step += 1;
        let phase = self.step as f64 * 0.3;
        Ok(InertialReading {
            accel: Axes::new(0.02 * phase.sin(), 0.02 * phase.cos(), STANDARD_GRAVITY),
            gyro: Axes::new(0.1 * phase.cos(), 0.1 * phase.sin(), 0.0),
            temperature: 30.0 + 0.5 * (phase / 10.0).sin(),
        })
    }
}

pub struct SimulatedBusOpener;

impl BusOpener for SimulatedBusOpener {
    fn open(&self, interface: &str) -> Result<Box<dyn BusTransport>, SensorError> {
        let base_id = interface
            .bytes()
            .fold(0x100u32, |id, b| (id + u32::from(b)) & 0x7ff);
        Ok(Box::new(SimulatedBus { base_id, tick: 0 }))
    }
}

/// Delivers a counter frame on every other receive and times out in between
pub struct SimulatedBus {
    base_id: u32,
    tick: u64,
}

impl BusTransport for SimulatedBus {
    fn receive(&mut self, timeout: Duration) -> BusReceive {
        self.tick += 1;
        if self.tick % 2 == 1 {
            return BusReceive::Frame(RawFrame {
                id: self.base_id,
                extended: false,
                data: self.tick.to_be_bytes().to_vec(),
            });
        }
        std::thread::sleep(timeout);
        BusReceive::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_monitor_tracks_rail() {
        let mut monitor = SimulatedPowerMonitor::new(0x41);
        for _ in 0..50 {
            let reading = monitor.read().unwrap();
            assert!((reading.bus_voltage - 5.0).abs() <= 0.05);
            assert!(reading.current_ma > 0.0);
        }
    }

    #[test]
    fn test_bus_alternates_frame_and_empty() {
        let mut bus = SimulatedBusOpener.open("can0").unwrap();
        let timeout = Duration::from_millis(1);

        assert!(matches!(bus.receive(timeout), BusReceive::Frame(ref f) if f.data.len() == 8));
        assert!(matches!(bus.receive(timeout), BusReceive::Empty));
        assert!(matches!(bus.receive(timeout), BusReceive::Frame(_)));
    }

    #[test]
    fn test_bus_ids_differ_per_interface() {
        let id = |name: &str| match SimulatedBusOpener.open(name).unwrap().receive(Duration::ZERO) {
            BusReceive::Frame(frame) => frame.id,
            other => panic!("unexpected {other:?}"),
        };
        assert_ne!(id("can0"), id("can1"));
    }
}
