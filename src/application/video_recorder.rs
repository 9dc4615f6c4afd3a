// Video recorder trait - secondary collaborator started and stopped with each session
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to launch recorder: {0}")]
    Launch(#[source] std::io::Error),

    #[error("failed to stop recorder: {0}")]
    Stop(#[source] std::io::Error),
}

#[async_trait]
pub trait VideoRecorder: Send + Sync {
    /// Disabled recorders are skipped without a warning
    fn is_enabled(&self) -> bool {
        true
    }

    /// Begins recording into `output`, replacing any recording in progress
    async fn start(&self, output: &Path) -> Result<(), VideoError>;

    /// Ends the current recording; a no-op when nothing is recording
    async fn stop(&self) -> Result<(), VideoError>;
}

pub struct DisabledRecorder;

#[async_trait]
impl VideoRecorder for DisabledRecorder {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn start(&self, _output: &Path) -> Result<(), VideoError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), VideoError> {
        Ok(())
    }
}
