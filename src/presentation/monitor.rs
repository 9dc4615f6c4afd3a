// Terminal power monitor - live readings of the power channels
use crate::application::rig::Rig;
use crate::domain::sample::{PowerReading, PowerSample, Timestamp};
use std::fmt::Write as _;
use std::io::Write as _;
use std::time::Duration;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// One report line; current is shown in amps
pub fn format_power_line(reading: PowerReading) -> String {
    let sample = PowerSample::new(Timestamp::now(), reading);
    format!(
        "PSU Voltage:{:6.3}V    Shunt Voltage:{:9.6}V    Load Voltage:{:6.3}V    Power:{:9.6}W    Current:{:9.6}A",
        sample.psu_voltage, sample.shunt_voltage, sample.load_voltage, sample.power, sample.current
    )
}

/// Parses `CH<n>` into a one-based power channel position
pub fn parse_channel(raw: &str) -> Result<usize, String> {
    raw.to_ascii_uppercase()
        .strip_prefix("CH")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| format!("expected CH<n>, got {raw}"))
}

fn render(rig: &mut Rig, only: Option<usize>) -> String {
    let mut screen = String::new();
    for (position, (id, monitor)) in rig.power_monitors_mut().enumerate() {
        let number = position + 1;
        if only.is_some_and(|n| n != number) {
            continue;
        }
        let _ = writeln!(screen, "Channel {number} ({id}):");
        match monitor.read() {
            Ok(reading) => {
                let _ = writeln!(screen, "{}", format_power_line(reading));
            }
            Err(e) => {
                let _ = writeln!(screen, "unavailable: {e}");
            }
        }
    }
    screen
}

/// Prints every `interval` until Ctrl-C
pub async fn run(mut rig: Rig, only: Option<usize>, interval: Duration) -> anyhow::Result<()> {
    let channels = rig.power_monitors_mut().count();
    if let Some(n) = only.filter(|n| *n > channels) {
        anyhow::bail!("CH{n} is not configured; the rig has {channels} power channels");
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let screen = tokio::task::block_in_place(|| render(&mut rig, only));
                let mut stdout = std::io::stdout().lock();
                write!(stdout, "{CLEAR_SCREEN}{screen}")?;
                stdout.flush()?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::RigConfig;
    use crate::infrastructure::rig_builder::build_rig;

    #[test]
    fn test_format_power_line() {
        let line = format_power_line(PowerReading {
            bus_voltage: 12.0,
            shunt_voltage: 0.05,
            power: 1.5,
            current_ma: 125.0,
        });
        assert_eq!(
            line,
            "PSU Voltage:12.050V    Shunt Voltage: 0.050000V    Load Voltage:12.000V    Power: 1.500000W    Current: 0.125000A"
        );
    }

    #[test]
    fn test_parse_channel() {
        assert_eq!(parse_channel("CH2"), Ok(2));
        assert_eq!(parse_channel("ch3"), Ok(3));
        assert!(parse_channel("CH0").is_err());
        assert!(parse_channel("2").is_err());
    }

    #[test]
    fn test_render_single_channel() {
        let mut rig = build_rig(&RigConfig::default()).unwrap();
        let screen = render(&mut rig, Some(2));
        assert!(screen.starts_with("Channel 2 (channel_2):\n"));
        assert!(!screen.contains("Channel 1"));
        assert_eq!(screen.lines().count(), 2);

        let screen = render(&mut rig, None);
        assert_eq!(screen.lines().count(), 6);
    }
}
