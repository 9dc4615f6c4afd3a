// Sampling loop - polls every rig channel once per pass and routes records to channel logs
use crate::application::rig::{Rig, RigSource};
use crate::application::sensors::{
    BusOpener, BusReceive, BusTransport, InertialSensor, PowerMonitor, SensorError,
};
use crate::domain::sample::{BusFrame, InertialSample, PowerSample, Record, Timestamp};
use crate::infrastructure::channel_log::{ChannelLog, ChannelLogError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Per-source failures logged at warn level: the first one, then every Nth
const WARN_EVERY: u64 = 100;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub directory: PathBuf,
    pub bus_timeout: Duration,
    /// Pause between passes; zero runs passes back to back
    pub interval: Duration,
}

/// Resource acquisition failure at session entry
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open log for channel {channel}: {source}")]
    Log {
        channel: String,
        #[source]
        source: ChannelLogError,
    },

    #[error("failed to open bus {interface} for channel {channel}: {source}")]
    Bus {
        channel: String,
        interface: String,
        #[source]
        source: SensorError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: String,
    pub records: u64,
    pub skipped: u64,
    pub write_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub iterations: u64,
    pub channels: Vec<ChannelSummary>,
}

/// Open bus transport, shut down exactly once either by `release` or on drop
struct BusGuard {
    interface: String,
    transport: Option<Box<dyn BusTransport>>,
}

impl BusGuard {
    fn open(opener: &dyn BusOpener, interface: &str) -> Result<Self, SensorError> {
        let transport = opener.open(interface)?;
        Ok(Self {
            interface: interface.to_string(),
            transport: Some(transport),
        })
    }

    fn receive(&mut self, timeout: Duration) -> BusReceive {
        match self.transport.as_mut() {
            Some(transport) => transport.receive(timeout),
            None => BusReceive::TransportError(SensorError::Unavailable(format!(
                "{} already released",
                self.interface
            ))),
        }
    }

    fn release(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
            tracing::debug!("Released bus {}", self.interface);
        }
    }
}

impl Drop for BusGuard {
    fn drop(&mut self) {
        self.release();
    }
}

enum ActiveSource<'r> {
    Power(&'r mut Box<dyn PowerMonitor>),
    Inertial(&'r mut Box<dyn InertialSensor>),
    Bus(BusGuard),
}

struct ActiveChannel<'r> {
    id: String,
    log: ChannelLog,
    source: ActiveSource<'r>,
    records: u64,
    skipped: u64,
    write_failures: u64,
}

impl ActiveChannel<'_> {
    fn sample(&mut self, timestamp: &Timestamp, bus_timeout: Duration) {
        let outcome = match &mut self.source {
            ActiveSource::Power(monitor) => monitor
                .read()
                .map(|reading| Some(Record::Power(PowerSample::new(timestamp.clone(), reading)))),
            ActiveSource::Inertial(sensor) => sensor.read().map(|reading| {
                Some(Record::Inertial(InertialSample::new(timestamp.clone(), reading)))
            }),
            ActiveSource::Bus(bus) => match bus.receive(bus_timeout) {
                BusReceive::Frame(frame) => {
                    Ok(Some(Record::Bus(BusFrame::new(timestamp.clone(), &frame))))
                }
                BusReceive::Empty => Ok(None),
                BusReceive::TransportError(e) => Err(e),
            },
        };

        match outcome {
            Ok(Some(record)) => match self.log.write(&record) {
                Ok(()) => self.records += 1,
                Err(e) => {
                    self.write_failures += 1;
                    if self.write_failures % WARN_EVERY == 1 {
                        tracing::warn!("Channel {}: dropping record: {}", self.id, e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.skipped += 1;
                if self.skipped % WARN_EVERY == 1 {
                    tracing::warn!("Channel {}: skipping source this pass: {}", self.id, e);
                } else {
                    tracing::debug!("Channel {}: skipping source this pass: {}", self.id, e);
                }
            }
        }
    }

    fn summary(&self) -> ChannelSummary {
        ChannelSummary {
            id: self.id.clone(),
            records: self.records,
            skipped: self.skipped,
            write_failures: self.write_failures,
        }
    }
}

/// Every channel log and bus transport of one collection session.
///
/// Logs and transports are released by `drain`, or by their drop guards if the
/// session unwinds.
pub struct Session<'r> {
    channels: Vec<ActiveChannel<'r>>,
    bus_timeout: Duration,
    iterations: u64,
}

impl<'r> Session<'r> {
    /// Opens every channel log and bus transport. Anything already opened is
    /// released again if a later channel fails.
    pub fn open(rig: &'r mut Rig, settings: &LoopSettings) -> Result<Self, SessionError> {
        let (rig_channels, buses) = rig.parts_mut();
        let mut channels = Vec::with_capacity(rig_channels.len());

        for channel in rig_channels.iter_mut() {
            let id = channel.id.clone();
            let kind = channel.kind();
            let log = ChannelLog::open(settings.directory.join(&channel.file), kind).map_err(
                |source| SessionError::Log {
                    channel: id.clone(),
                    source,
                },
            )?;

            let source = match &mut channel.source {
                RigSource::Power(monitor) => ActiveSource::Power(monitor),
                RigSource::Inertial(sensor) => ActiveSource::Inertial(sensor),
                RigSource::Bus { interface } => {
                    let guard = BusGuard::open(buses, interface).map_err(|source| {
                        SessionError::Bus {
                            channel: id.clone(),
                            interface: interface.clone(),
                            source,
                        }
                    })?;
                    ActiveSource::Bus(guard)
                }
            };

            channels.push(ActiveChannel {
                id,
                log,
                source,
                records: 0,
                skipped: 0,
                write_failures: 0,
            });
        }

        Ok(Self {
            channels,
            bus_timeout: settings.bus_timeout,
            iterations: 0,
        })
    }

    /// One pass over every channel in rig order, all stamped with `timestamp`
    pub fn sample_all(&mut self, timestamp: &Timestamp) {
        for channel in &mut self.channels {
            channel.sample(timestamp, self.bus_timeout);
        }
        self.iterations += 1;
    }

    /// Samples until `collecting` is observed false at the top of a pass, then drains.
    pub fn run(mut self, collecting: &AtomicBool, interval: Duration) -> SessionSummary {
        while collecting.load(Ordering::Acquire) {
            let timestamp = Timestamp::now();
            self.sample_all(&timestamp);

            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        self.drain()
    }

    /// Shuts down every bus, then flushes and closes every log.
    pub fn drain(mut self) -> SessionSummary {
        for channel in &mut self.channels {
            if let ActiveSource::Bus(bus) = &mut channel.source {
                bus.release();
            }
        }

        let summary = SessionSummary {
            iterations: self.iterations,
            channels: self.channels.iter().map(ActiveChannel::summary).collect(),
        };

        for channel in self.channels {
            let path = channel.log.path().to_path_buf();
            if let Err(e) = channel.log.close() {
                tracing::warn!("Channel {}: failed to close {}: {}", channel.id, path.display(), e);
            }
        }

        summary
    }
}

/// Body of the sampling task: opens a session on `rig`, reports the outcome on
/// `ready`, samples until the flag drops, and hands the rig back. The flag is
/// cleared here when the session never starts sampling.
pub fn run(
    mut rig: Rig,
    settings: &LoopSettings,
    collecting: &AtomicBool,
    ready: oneshot::Sender<Result<(), SessionError>>,
) -> Rig {
    run_session(&mut rig, settings, collecting, ready);
    rig
}

fn run_session(
    rig: &mut Rig,
    settings: &LoopSettings,
    collecting: &AtomicBool,
    ready: oneshot::Sender<Result<(), SessionError>>,
) {
    let session = match Session::open(rig, settings) {
        Ok(session) => session,
        Err(e) => {
            collecting.store(false, Ordering::Release);
            let _ = ready.send(Err(e));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        tracing::warn!("Session starter went away; draining immediately");
        collecting.store(false, Ordering::Release);
        session.drain();
        return;
    }

    tracing::info!("Sampling loop running in {}", settings.directory.display());
    let summary = session.run(collecting, settings.interval);

    for channel in &summary.channels {
        tracing::info!(
            "Channel {} drained: records={} skipped={} write_failures={}",
            channel.id,
            channel.records,
            channel.skipped,
            channel.write_failures
        );
    }
    tracing::info!("Sampling loop stopped after {} passes", summary.iterations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rig::RigChannel;
    use crate::domain::sample::{Axes, InertialReading, PowerReading, RawFrame};
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    struct FixedPower(f64);

    impl PowerMonitor for FixedPower {
        fn read(&mut self) -> Result<PowerReading, SensorError> {
            Ok(PowerReading {
                bus_voltage: self.0,
                shunt_voltage: 0.1,
                power: 2.0,
                current_ma: 150.0,
            })
        }
    }

    struct FailingPower;

    impl PowerMonitor for FailingPower {
        fn read(&mut self) -> Result<PowerReading, SensorError> {
            Err(SensorError::Transfer("nack".to_string()))
        }
    }

    struct FixedImu;

    impl InertialSensor for FixedImu {
        fn read(&mut self) -> Result<InertialReading, SensorError> {
            Ok(InertialReading {
                accel: Axes::new(0.0, 0.0, 9.8),
                gyro: Axes::new(0.5, -0.5, 0.0),
                temperature: 31.0,
            })
        }
    }

    /// Replays scripted receives per interface and counts shutdowns
    #[derive(Default)]
    struct ScriptedBuses {
        scripts: Mutex<Vec<(String, VecDeque<BusReceive>)>>,
        failing: Vec<String>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl ScriptedBuses {
        fn script(self, interface: &str, receives: Vec<BusReceive>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .push((interface.to_string(), receives.into()));
            self
        }
    }

    struct ScriptedBus {
        receives: VecDeque<BusReceive>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl BusTransport for ScriptedBus {
        fn receive(&mut self, _timeout: Duration) -> BusReceive {
            self.receives.pop_front().unwrap_or(BusReceive::Empty)
        }

        fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl BusOpener for ScriptedBuses {
        fn open(&self, interface: &str) -> Result<Box<dyn BusTransport>, SensorError> {
            if self.failing.iter().any(|f| f == interface) {
                return Err(SensorError::Unavailable(interface.to_string()));
            }
            let mut scripts = self.scripts.lock().unwrap();
            let receives = scripts
                .iter_mut()
                .find(|(name, _)| name == interface)
                .map(|(_, receives)| std::mem::take(receives))
                .unwrap_or_default();
            Ok(Box::new(ScriptedBus {
                receives,
                shutdowns: Arc::clone(&self.shutdowns),
            }))
        }
    }

    fn frame(id: u32, data: &[u8]) -> BusReceive {
        BusReceive::Frame(RawFrame {
            id,
            extended: false,
            data: data.to_vec(),
        })
    }

    fn six_channel_rig(buses: ScriptedBuses) -> Rig {
        let channels = vec![
            RigChannel::new("channel_1", "channel_1.csv", RigSource::Power(Box::new(FixedPower(12.0)))),
            RigChannel::new("channel_2", "channel_2.csv", RigSource::Power(Box::new(FixedPower(5.0)))),
            RigChannel::new("channel_3", "channel_3.csv", RigSource::Power(Box::new(FixedPower(3.3)))),
            RigChannel::new("mpu6050", "mpu6050.csv", RigSource::Inertial(Box::new(FixedImu))),
            RigChannel::new("can0", "can0.csv", RigSource::Bus { interface: "can0".to_string() }),
            RigChannel::new("can1", "can1.csv", RigSource::Bus { interface: "can1".to_string() }),
        ];
        Rig::new(channels, Arc::new(buses))
    }

    fn settings(directory: &Path) -> LoopSettings {
        LoopSettings {
            directory: directory.to_path_buf(),
            bus_timeout: Duration::from_millis(1),
            interval: Duration::ZERO,
        }
    }

    fn rows(path: &Path) -> Vec<Vec<String>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_one_pass_writes_one_row_per_channel_with_shared_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let buses = ScriptedBuses::default()
            .script("can0", vec![frame(0x123, &[1, 2])])
            .script("can1", vec![frame(0x7ff, &[])]);
        let mut rig = six_channel_rig(buses);

        let mut session = Session::open(&mut rig, &settings(dir.path())).unwrap();
        let timestamp = Timestamp::now();
        session.sample_all(&timestamp);
        let summary = session.drain();

        assert_eq!(summary.iterations, 1);
        for file in ["channel_1", "channel_2", "channel_3", "mpu6050", "can0", "can1"] {
            let rows = rows(&dir.path().join(format!("{file}.csv")));
            assert_eq!(rows.len(), 1, "{file}");
            assert_eq!(rows[0][0], timestamp.as_str(), "{file}");
        }

        assert_eq!(rows(&dir.path().join("can0.csv"))[0][1..], ["0x123", "0102"]);
        assert_eq!(rows(&dir.path().join("can1.csv"))[0][1..], ["0x7ff", "No Data"]);
        assert_eq!(rows(&dir.path().join("channel_2.csv"))[0][3], "5");
    }

    #[test]
    fn test_empty_and_failing_bus_produce_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let buses = ScriptedBuses::default()
            .script("can0", vec![BusReceive::Empty])
            .script(
                "can1",
                vec![BusReceive::TransportError(SensorError::Transfer("bus-off".to_string()))],
            );
        let shutdowns = Arc::clone(&buses.shutdowns);
        let mut rig = six_channel_rig(buses);

        let mut session = Session::open(&mut rig, &settings(dir.path())).unwrap();
        session.sample_all(&Timestamp::now());
        let summary = session.drain();

        assert!(rows(&dir.path().join("can0.csv")).is_empty());
        assert!(rows(&dir.path().join("can1.csv")).is_empty());
        assert_eq!(rows(&dir.path().join("mpu6050.csv")).len(), 1);

        let can1 = summary.channels.iter().find(|c| c.id == "can1").unwrap();
        assert_eq!((can1.records, can1.skipped), (0, 1));
        let can0 = summary.channels.iter().find(|c| c.id == "can0").unwrap();
        assert_eq!((can0.records, can0.skipped), (0, 0));
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_sensor_does_not_stop_other_channels() {
        let dir = tempfile::tempdir().unwrap();
        let channels = vec![
            RigChannel::new("channel_1", "channel_1.csv", RigSource::Power(Box::new(FailingPower))),
            RigChannel::new("channel_2", "channel_2.csv", RigSource::Power(Box::new(FixedPower(5.0)))),
        ];
        let mut rig = Rig::new(channels, Arc::new(ScriptedBuses::default()));

        let mut session = Session::open(&mut rig, &settings(dir.path())).unwrap();
        session.sample_all(&Timestamp::now());
        session.sample_all(&Timestamp::now());
        let summary = session.drain();

        assert!(rows(&dir.path().join("channel_1.csv")).is_empty());
        assert_eq!(rows(&dir.path().join("channel_2.csv")).len(), 2);
        assert_eq!(summary.channels[0].skipped, 2);
    }

    #[test]
    fn test_bus_open_failure_releases_already_opened_bus() {
        let dir = tempfile::tempdir().unwrap();
        let buses = ScriptedBuses {
            failing: vec!["can1".to_string()],
            ..Default::default()
        };
        let shutdowns = Arc::clone(&buses.shutdowns);
        let mut rig = six_channel_rig(buses);

        let err = Session::open(&mut rig, &settings(dir.path())).err().unwrap();
        assert!(matches!(err, SessionError::Bus { ref interface, .. } if interface == "can1"));
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = six_channel_rig(ScriptedBuses::default());
        let settings = settings(&dir.path().join("missing"));

        let err = Session::open(&mut rig, &settings).err().unwrap();
        assert!(matches!(err, SessionError::Log { ref channel, .. } if channel == "channel_1"));
    }

    #[test]
    fn test_run_exits_when_flag_cleared_and_returns_rig() {
        let dir = tempfile::tempdir().unwrap();
        let rig = six_channel_rig(ScriptedBuses::default());
        let settings = settings(dir.path());
        let collecting = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel();

        let flag = Arc::clone(&collecting);
        let worker = std::thread::spawn(move || run(rig, &settings, &flag, ready_tx));

        assert!(ready_rx.blocking_recv().unwrap().is_ok());
        std::thread::sleep(Duration::from_millis(20));
        collecting.store(false, Ordering::Release);
        let rig = worker.join().unwrap();

        assert_eq!(rig.channels().len(), 6);
        let power_rows = rows(&dir.path().join("channel_1.csv"));
        let imu_rows = rows(&dir.path().join("mpu6050.csv"));
        assert!(!power_rows.is_empty());
        assert_eq!(power_rows.len(), imu_rows.len());
    }

    #[test]
    fn test_run_reports_open_failure_on_ready() {
        let dir = tempfile::tempdir().unwrap();
        let rig = six_channel_rig(ScriptedBuses {
            failing: vec!["can0".to_string()],
            ..Default::default()
        });
        let collecting = AtomicBool::new(true);
        let (ready_tx, mut ready_rx) = oneshot::channel();

        let rig = run(rig, &settings(dir.path()), &collecting, ready_tx);

        assert!(matches!(ready_rx.try_recv(), Ok(Err(SessionError::Bus { .. }))));
        assert_eq!(rig.channels().len(), 6);
        assert!(!collecting.load(Ordering::Acquire));
    }

    #[test]
    fn test_run_drains_and_clears_flag_when_starter_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let buses = ScriptedBuses::default();
        let shutdowns = Arc::clone(&buses.shutdowns);
        let rig = six_channel_rig(buses);
        let collecting = AtomicBool::new(true);
        let (ready_tx, ready_rx) = oneshot::channel();
        drop(ready_rx);

        let rig = run(rig, &settings(dir.path()), &collecting, ready_tx);

        assert!(!collecting.load(Ordering::Acquire));
        assert_eq!(rig.channels().len(), 6);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
        assert_eq!(rows(&dir.path().join("channel_1.csv")).len(), 0);
    }
}
