// Sample domain models
use super::channel::ChannelKind;
use chrono::{Local, NaiveDateTime};
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Marker written in place of an empty bus payload
pub const NO_DATA: &str = "No Data";

/// Wall-clock second shared by every record produced in one loop pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw power-monitor registers converted to physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    /// Volts on the load side of the shunt
    pub bus_voltage: f64,
    /// Volts across the shunt
    pub shunt_voltage: f64,
    /// Watts
    pub power: f64,
    /// Milliamps
    pub current_ma: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerSample {
    pub timestamp: Timestamp,
    pub psu_voltage: f64,
    pub shunt_voltage: f64,
    pub load_voltage: f64,
    pub power: f64,
    /// Amps
    pub current: f64,
}

impl PowerSample {
    pub fn new(timestamp: Timestamp, reading: PowerReading) -> Self {
        Self {
            timestamp,
            psu_voltage: reading.bus_voltage + reading.shunt_voltage,
            shunt_voltage: reading.shunt_voltage,
            load_voltage: reading.bus_voltage,
            power: reading.power,
            current: reading.current_ma / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InertialReading {
    /// m/s^2
    pub accel: Axes,
    /// deg/s
    pub gyro: Axes,
    /// deg C
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InertialSample {
    pub timestamp: Timestamp,
    pub reading: InertialReading,
}

impl InertialSample {
    pub fn new(timestamp: Timestamp, reading: InertialReading) -> Self {
        Self { timestamp, reading }
    }
}

/// Frame as delivered by a bus transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub id: u32,
    pub extended: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusFrame {
    pub timestamp: Timestamp,
    pub can_id: String,
    pub data: String,
}

impl BusFrame {
    pub fn new(timestamp: Timestamp, frame: &RawFrame) -> Self {
        let can_id = if frame.extended {
            format!("0x{:08x}", frame.id)
        } else {
            format!("0x{:03x}", frame.id)
        };

        let data = if frame.data.is_empty() {
            NO_DATA.to_string()
        } else {
            frame.data.iter().map(|b| format!("{b:02x}")).collect()
        };

        Self {
            timestamp,
            can_id,
            data,
        }
    }
}

/// One row destined for a channel log
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Power(PowerSample),
    Inertial(InertialSample),
    Bus(BusFrame),
}

impl Record {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Record::Power(_) => ChannelKind::Power,
            Record::Inertial(_) => ChannelKind::Inertial,
            Record::Bus(_) => ChannelKind::Bus,
        }
    }

    #[cfg(test)]
    pub fn timestamp(&self) -> &Timestamp {
        match self {
            Record::Power(sample) => &sample.timestamp,
            Record::Inertial(sample) => &sample.timestamp,
            Record::Bus(frame) => &frame.timestamp,
        }
    }

    /// Field values in the order of `ChannelKind::header`
    pub fn fields(&self) -> Vec<String> {
        match self {
            Record::Power(s) => vec![
                s.timestamp.to_string(),
                s.psu_voltage.to_string(),
                s.shunt_voltage.to_string(),
                s.load_voltage.to_string(),
                s.power.to_string(),
                s.current.to_string(),
            ],
            Record::Inertial(s) => {
                let r = &s.reading;
                vec![
                    s.timestamp.to_string(),
                    r.accel.x.to_string(),
                    r.accel.y.to_string(),
                    r.accel.z.to_string(),
                    r.gyro.x.to_string(),
                    r.gyro.y.to_string(),
                    r.gyro.z.to_string(),
                    r.temperature.to_string(),
                ]
            }
            Record::Bus(f) => vec![f.timestamp.to_string(), f.can_id.clone(), f.data.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_timestamp() -> Timestamp {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 2))
            .unwrap();
        Timestamp::from_datetime(datetime)
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(fixed_timestamp().as_str(), "2024-03-09 07:05:02");
    }

    #[test]
    fn test_power_sample_derives_fields() {
        let reading = PowerReading {
            bus_voltage: 12.0,
            shunt_voltage: 0.5,
            power: 6.0,
            current_ma: 500.0,
        };
        let sample = PowerSample::new(fixed_timestamp(), reading);

        assert_eq!(sample.psu_voltage, 12.5);
        assert_eq!(sample.load_voltage, 12.0);
        assert_eq!(sample.shunt_voltage, 0.5);
        assert_eq!(sample.current, 0.5);
    }

    #[test]
    fn test_bus_frame_rendering() {
        let frame = RawFrame {
            id: 0x1a,
            extended: false,
            data: vec![0xde, 0xad, 0x01],
        };
        let rendered = BusFrame::new(fixed_timestamp(), &frame);
        assert_eq!(rendered.can_id, "0x01a");
        assert_eq!(rendered.data, "dead01");

        let extended = RawFrame {
            id: 0x18ff50e5,
            extended: true,
            data: Vec::new(),
        };
        let rendered = BusFrame::new(fixed_timestamp(), &extended);
        assert_eq!(rendered.can_id, "0x18ff50e5");
        assert_eq!(rendered.data, NO_DATA);
    }

    #[test]
    fn test_fields_match_header_width() {
        let ts = fixed_timestamp();
        let records = [
            Record::Power(PowerSample::new(
                ts.clone(),
                PowerReading {
                    bus_voltage: 5.0,
                    shunt_voltage: 0.01,
                    power: 1.0,
                    current_ma: 200.0,
                },
            )),
            Record::Inertial(InertialSample::new(ts.clone(), InertialReading::default())),
            Record::Bus(BusFrame::new(
                ts.clone(),
                &RawFrame {
                    id: 1,
                    extended: false,
                    data: vec![1],
                },
            )),
        ];

        for record in &records {
            let fields = record.fields();
            assert_eq!(fields.len(), record.kind().header().len());
            assert_eq!(fields[0], ts.as_str());
            assert_eq!(record.timestamp(), &ts);
        }
    }
}
