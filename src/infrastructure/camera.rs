// Camera recorder running the configured capture program as a child process
use crate::application::video_recorder::{VideoError, VideoRecorder};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Time a recorder gets to finish its file after SIGINT
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Launches `<program> <args...> -o <output>` per recording. Stop interrupts it
/// so the encoder can flush, and kills it if it does not exit within the grace period.
pub struct ProcessRecorder {
    program: String,
    args: Vec<String>,
    stop_grace: Duration,
    child: Mutex<Option<Child>>,
}

impl ProcessRecorder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stop_grace: STOP_GRACE,
            child: Mutex::new(None),
        }
    }

    async fn terminate(&self, mut child: Child) -> Result<(), VideoError> {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;

                match kill(Pid::from_raw(pid), Signal::SIGINT) {
                    Ok(()) => match tokio::time::timeout(self.stop_grace, child.wait()).await {
                        Ok(status) => {
                            let status = status.map_err(VideoError::Stop)?;
                            tracing::debug!("Recorder exited with {}", status);
                            return Ok(());
                        }
                        Err(_) => tracing::warn!(
                            "Recorder still running {:?} after SIGINT; killing it",
                            self.stop_grace
                        ),
                    },
                    Err(e) => tracing::warn!("Failed to interrupt recorder: {}", e),
                }
            }
        }
        child.kill().await.map_err(VideoError::Stop)
    }
}

#[async_trait]
impl VideoRecorder for ProcessRecorder {
    async fn start(&self, output: &Path) -> Result<(), VideoError> {
        let mut slot = self.child.lock().await;
        if let Some(previous) = slot.take() {
            self.terminate(previous).await?;
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(VideoError::Launch)?;

        tracing::info!("Recording video to {}", output.display());
        *slot = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<(), VideoError> {
        match self.child.lock().await.take() {
            Some(child) => {
                self.terminate(child).await?;
                tracing::info!("Video recording stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
