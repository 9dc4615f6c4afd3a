// Append-only CSV log for one channel
use crate::domain::channel::ChannelKind;
use crate::domain::sample::Record;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelLogError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{found} record routed to {expected} log {path}")]
    KindMismatch {
        path: PathBuf,
        expected: ChannelKind,
        found: ChannelKind,
    },
}

/// Exclusive append handle on one channel's CSV file.
///
/// The header row is written only when the file is empty at open time, so
/// reopening the same file across sessions never duplicates it. Every record
/// is flushed as a whole line. Dropping an open log flushes it; `close`
/// does the same and reports the outcome.
pub struct ChannelLog {
    path: PathBuf,
    kind: ChannelKind,
    writer: Option<csv::Writer<File>>,
}

impl ChannelLog {
    pub fn open(path: impl AsRef<Path>, kind: ChannelKind) -> Result<Self, ChannelLogError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| ChannelLogError::Open {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;
        let was_empty = file.metadata().map_err(open_err)?.len() == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(file);

        let mut log = Self {
            path,
            kind,
            writer: Some(writer),
        };

        if was_empty {
            log.append(kind.header())?;
            tracing::debug!("Wrote {} header to {}", kind, log.path.display());
        }

        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, record: &Record) -> Result<(), ChannelLogError> {
        if record.kind() != self.kind {
            return Err(ChannelLogError::KindMismatch {
                path: self.path.clone(),
                expected: self.kind,
                found: record.kind(),
            });
        }
        self.append(record.fields())
    }

    pub fn close(mut self) -> Result<(), ChannelLogError> {
        match self.writer.take() {
            Some(mut writer) => writer.flush().map_err(|source| ChannelLogError::Flush {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }

    fn append<I, T>(&mut self, fields: I) -> Result<(), ChannelLogError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        writer
            .write_record(fields)
            .map_err(|source| ChannelLogError::Write {
                path: self.path.clone(),
                source,
            })?;
        writer.flush().map_err(|source| ChannelLogError::Flush {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for ChannelLog {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::warn!("Failed to flush {} on release: {}", self.path.display(), e);
            }
        }
    }
}
