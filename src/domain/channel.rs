// Channel kinds and their fixed record layouts
use serde::Deserialize;
use std::fmt;

const POWER_HEADER: &[&str] = &[
    "Timestamp",
    "PSU Voltage",
    "Shunt Voltage",
    "Load Voltage",
    "Power",
    "Current",
];

const BUS_HEADER: &[&str] = &["Timestamp", "CAN ID", "Data"];

const INERTIAL_HEADER: &[&str] = &[
    "Timestamp",
    "Accel_X",
    "Accel_Y",
    "Accel_Z",
    "Gyro_X",
    "Gyro_Y",
    "Gyro_Z",
    "Temperature",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Power,
    Inertial,
    Bus,
}

impl ChannelKind {
    /// Field names written once at the top of every log of this kind
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            ChannelKind::Power => POWER_HEADER,
            ChannelKind::Inertial => INERTIAL_HEADER,
            ChannelKind::Bus => BUS_HEADER,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Power => "power",
            ChannelKind::Inertial => "inertial",
            ChannelKind::Bus => "bus",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_start_with_timestamp() {
        for kind in [ChannelKind::Power, ChannelKind::Inertial, ChannelKind::Bus] {
            assert_eq!(kind.header()[0], "Timestamp");
        }
        assert_eq!(ChannelKind::Power.header().len(), 6);
        assert_eq!(ChannelKind::Bus.header().len(), 3);
        assert_eq!(ChannelKind::Inertial.header().len(), 8);
    }
}
