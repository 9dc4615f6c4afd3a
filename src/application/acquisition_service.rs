// Acquisition service - Start/stop lifecycle of collection sessions
use crate::application::rig::Rig;
use crate::application::sampling_loop::{self, LoopSettings, SessionError};
use crate::application::video_recorder::VideoRecorder;
use chrono::Local;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Data collection is already running.")]
    AlreadyRunning,

    #[error("Data collection is not running.")]
    NotRunning,

    #[error("Failed to start data collection: {0}")]
    SessionStart(#[from] SessionError),

    #[error("Sensor rig is unavailable: {0}")]
    RigUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// File name of the recording, when the recorder started
    pub video_file: Option<String>,
}

/// Who holds the rig between sessions
enum RigSlot {
    Idle(Rig),
    /// The sampling task owns the rig until it drains
    Sampling(JoinHandle<Rig>),
    Lost(String),
}

/// Owns the collecting flag and the rig.
///
/// The flag is the only signal the sampling loop observes. The slot mutex only
/// serializes start/stop requests against each other; the loop never takes it.
#[derive(Clone)]
pub struct AcquisitionService {
    collecting: Arc<AtomicBool>,
    slot: Arc<Mutex<RigSlot>>,
    settings: Arc<LoopSettings>,
    video: Arc<dyn VideoRecorder>,
}

impl AcquisitionService {
    pub fn new(rig: Rig, settings: LoopSettings, video: Arc<dyn VideoRecorder>) -> Self {
        Self {
            collecting: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(RigSlot::Idle(rig))),
            settings: Arc::new(settings),
            video,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::Acquire)
    }

    /// Opens a session and launches the sampling loop on a blocking task.
    ///
    /// Returns once every log and bus is open. If acquisition fails the flag is
    /// left false and the rig is kept for the next attempt. Video is started
    /// afterwards and never affects the outcome. The sequence runs on its own
    /// task, so dropping the returned future does not abandon it halfway.
    pub async fn start(&self) -> Result<StartOutcome, LifecycleError> {
        let service = self.clone();
        tokio::spawn(async move { service.start_session().await })
            .await
            .map_err(|e| LifecycleError::RigUnavailable(format!("start task failed: {e}")))?
    }

    async fn start_session(&self) -> Result<StartOutcome, LifecycleError> {
        let mut slot = self.slot.lock().await;
        if self.is_collecting() {
            return Err(LifecycleError::AlreadyRunning);
        }

        let rig = Self::reclaim(&mut slot).await?;

        self.collecting.store(true, Ordering::Release);
        let (ready_tx, ready_rx) = oneshot::channel();
        let collecting = Arc::clone(&self.collecting);
        let settings = Arc::clone(&self.settings);
        *slot = RigSlot::Sampling(tokio::task::spawn_blocking(move || {
            sampling_loop::run(rig, &settings, &collecting, ready_tx)
        }));

        match ready_rx.await {
            Ok(Ok(())) => {}
            outcome => {
                // the loop clears the flag itself; this also covers a task that panicked
                self.collecting.store(false, Ordering::Release);
                let err = match outcome {
                    Ok(Err(e)) => LifecycleError::SessionStart(e),
                    _ => LifecycleError::RigUnavailable(
                        "sampling task exited before reporting readiness".to_string(),
                    ),
                };
                if let Ok(rig) = Self::reclaim(&mut slot).await {
                    *slot = RigSlot::Idle(rig);
                }
                tracing::error!("{}", err);
                return Err(err);
            }
        }

        tracing::info!("Data collection started");
        // still under the slot lock, so a concurrent stop sees the recorder running
        let video_file = self.start_video().await;
        Ok(StartOutcome { video_file })
    }

    /// Clears the flag; the loop drains at its next pass boundary.
    /// Does not wait for the drain.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let service = self.clone();
        tokio::spawn(async move { service.stop_session().await })
            .await
            .map_err(|e| LifecycleError::RigUnavailable(format!("stop task failed: {e}")))?
    }

    async fn stop_session(&self) -> Result<(), LifecycleError> {
        let _slot = self.slot.lock().await;
        if self
            .collecting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LifecycleError::NotRunning);
        }

        tracing::info!("Data collection stopping");
        if self.video.is_enabled() {
            if let Err(e) = self.video.stop().await {
                tracing::warn!("Video recorder: {}", e);
            }
        }
        Ok(())
    }

    /// Waits for a stopped session to finish draining. Returns immediately
    /// while a session is still collecting.
    pub async fn wait_for_drain(&self) -> Result<(), LifecycleError> {
        let mut slot = self.slot.lock().await;
        if self.is_collecting() {
            return Ok(());
        }
        let rig = Self::reclaim(&mut slot).await?;
        *slot = RigSlot::Idle(rig);
        Ok(())
    }

    /// Stops any running session and waits until every log is closed
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        match self.stop().await {
            Ok(()) | Err(LifecycleError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.wait_for_drain().await
    }

    /// Takes the rig out of the slot, joining a draining loop first. The slot
    /// keeps the join handle while waiting, so cancelling here loses nothing.
    async fn reclaim(slot: &mut RigSlot) -> Result<Rig, LifecycleError> {
        if let RigSlot::Sampling(handle) = slot {
            let joined = handle.await;
            *slot = match joined {
                Ok(rig) => RigSlot::Idle(rig),
                Err(e) => RigSlot::Lost(format!("sampling task failed: {e}")),
            };
        }

        match std::mem::replace(slot, RigSlot::Lost(String::new())) {
            RigSlot::Idle(rig) => Ok(rig),
            RigSlot::Lost(reason) => {
                *slot = RigSlot::Lost(reason.clone());
                Err(LifecycleError::RigUnavailable(reason))
            }
            sampling @ RigSlot::Sampling(_) => {
                *slot = sampling;
                Err(LifecycleError::RigUnavailable(
                    "sampling task still running".to_string(),
                ))
            }
        }
    }

    async fn start_video(&self) -> Option<String> {
        if !self.video.is_enabled() {
            return None;
        }

        let file_name = format!("video_{}.h264", Local::now().format("%Y%m%d_%H%M%S"));
        let output = self.settings.directory.join(&file_name);
        match self.video.start(&output).await {
            Ok(()) => Some(file_name),
            Err(e) => {
                tracing::warn!("Video recorder: {}", e);
                None
            }
        }
    }
}
