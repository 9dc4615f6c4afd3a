use crate::domain::channel::ChannelKind;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct RigConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub rig: RigSettings,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub relays: RelaySettings,
    #[serde(default)]
    pub video: VideoSettings,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            sampling: SamplingSettings::default(),
            rig: RigSettings::default(),
            channels: default_channels(),
            relays: RelaySettings::default(),
            video: VideoSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            archive_name: default_archive_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SamplingSettings {
    #[serde(default = "default_bus_timeout_ms")]
    pub bus_timeout_ms: u64,
    #[serde(default)]
    pub interval_ms: u64,
}

impl SamplingSettings {
    pub fn bus_timeout(&self) -> Duration {
        Duration::from_millis(self.bus_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            bus_timeout_ms: default_bus_timeout_ms(),
            interval_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Hardware,
    #[default]
    Simulated,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RigSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: PathBuf,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            i2c_bus: default_i2c_bus(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChannelConfig {
    pub id: String,
    pub kind: ChannelKind,
    pub file: String,
    /// I2C address for power and inertial channels
    pub address: Option<u8>,
    /// Bus interface name for bus channels
    pub interface: Option<String>,
}

impl ChannelConfig {
    fn device(id: &str, kind: ChannelKind, file: &str, address: u8) -> Self {
        Self {
            id: id.to_string(),
            kind,
            file: file.to_string(),
            address: Some(address),
            interface: None,
        }
    }

    fn bus(interface: &str) -> Self {
        Self {
            id: interface.to_string(),
            kind: ChannelKind::Bus,
            file: format!("{interface}.csv"),
            address: None,
            interface: Some(interface.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RelayPin {
    pub channel: u8,
    pub gpio: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    #[serde(default = "default_true")]
    pub active_low: bool,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default = "default_relay_pins")]
    pub pins: Vec<RelayPin>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            active_low: true,
            sysfs_root: default_sysfs_root(),
            pins: default_relay_pins(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_video_program")]
    pub program: String,
    #[serde(default = "default_video_args")]
    pub args: Vec<String>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            program: default_video_program(),
            args: default_video_args(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("duplicate channel id {0}")]
    DuplicateChannel(String),

    #[error("channels {0} share log file {1}")]
    DuplicateFile(String, String),

    #[error("{kind} channel {id} needs an address")]
    MissingAddress { id: String, kind: ChannelKind },

    #[error("bus channel {0} needs an interface")]
    MissingInterface(String),

    #[error("duplicate relay channel CH{0}")]
    DuplicateRelay(u8),

    #[error("sampling.bus_timeout_ms must be at least 1")]
    ZeroBusTimeout,
}

impl RigConfig {
    /// Checks the channel topology and relay map for ambiguities serde cannot catch
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut files = HashSet::new();

        for channel in &self.channels {
            if !ids.insert(channel.id.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.id.clone()));
            }
            if !files.insert(channel.file.as_str()) {
                return Err(ConfigError::DuplicateFile(
                    channel.id.clone(),
                    channel.file.clone(),
                ));
            }
            match channel.kind {
                ChannelKind::Power | ChannelKind::Inertial if channel.address.is_none() => {
                    return Err(ConfigError::MissingAddress {
                        id: channel.id.clone(),
                        kind: channel.kind,
                    });
                }
                ChannelKind::Bus if channel.interface.is_none() => {
                    return Err(ConfigError::MissingInterface(channel.id.clone()));
                }
                _ => {}
            }
        }

        if self.sampling.bus_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusTimeout);
        }

        let mut relays = HashSet::new();
        for pin in &self.relays.pins {
            if !relays.insert(pin.channel) {
                return Err(ConfigError::DuplicateRelay(pin.channel));
            }
        }

        Ok(())
    }
}

pub const DEFAULT_CONFIG_PATH: &str = "config/rigd";

/// Loads the configuration layered with `RIGD__SECTION__KEY` overrides.
///
/// An explicit `path` (extension optional) must exist. Without one the default
/// location is read if present, otherwise the built-in defaults apply.
pub fn load_config(path: Option<&str>) -> anyhow::Result<RigConfig> {
    let file = match path {
        Some(path) => config::File::with_name(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
    };
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix("RIGD").separator("__"))
        .build()?;

    let config: RigConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from("csv")
}

fn default_archive_name() -> String {
    "csv_data.zip".to_string()
}

fn default_bus_timeout_ms() -> u64 {
    10
}

fn default_i2c_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}

fn default_true() -> bool {
    true
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

fn default_relay_pins() -> Vec<RelayPin> {
    [(1, 538), (2, 532), (3, 533)]
        .into_iter()
        .map(|(channel, gpio)| RelayPin { channel, gpio })
        .collect()
}

fn default_video_program() -> String {
    "rpicam-vid".to_string()
}

fn default_video_args() -> Vec<String> {
    [
        "--width", "1920", "--height", "1080", "--bitrate", "10000000", "--nopreview", "-t", "0",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::device("channel_1", ChannelKind::Power, "channel_1.csv", 0x40),
        ChannelConfig::device("channel_2", ChannelKind::Power, "channel_2.csv", 0x41),
        ChannelConfig::device("channel_3", ChannelKind::Power, "channel_3.csv", 0x42),
        ChannelConfig::device("mpu6050", ChannelKind::Inertial, "mpu6050.csv", 0x68),
        ChannelConfig::bus("can0"),
        ChannelConfig::bus("can1"),
    ]
}
