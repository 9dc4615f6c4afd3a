// ZIP archival of the channel logs in the storage directory
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone)]
pub struct ArchiveBundle {
    pub path: PathBuf,
    /// Entry names, identical to the source file names
    pub entries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LogArchiver {
    directory: PathBuf,
    archive_name: String,
}

impl LogArchiver {
    pub fn new(directory: impl Into<PathBuf>, archive_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            archive_name: archive_name.into(),
        }
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Bundles every `*.csv` file in the storage directory.
    ///
    /// Logs of a running session are read as they are at this moment; rows
    /// written meanwhile may or may not be included.
    pub async fn bundle(&self) -> Result<ArchiveBundle, ArchiveError> {
        let directory = self.directory.clone();
        let output = self.directory.join(&self.archive_name);
        tokio::task::spawn_blocking(move || bundle_logs(&directory, &output))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))?
    }
}

/// Writes a deflated ZIP of the `*.csv` files in `directory` (sorted by name) to `output`
pub fn bundle_logs(directory: &Path, output: &Path) -> Result<ArchiveBundle, ArchiveError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ArchiveError::Io { path, source }
    };

    let mut logs = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_err(directory))? {
        let entry = entry.map_err(io_err(directory))?;
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "csv");
        if is_log && entry.file_type().map_err(io_err(&path))?.is_file() {
            logs.push(path);
        }
    }
    logs.sort();

    let file = File::create(output).map_err(io_err(output))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(logs.len());
    for path in &logs {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, options)?;
        let mut source = File::open(path).map_err(io_err(path))?;
        io::copy(&mut source, &mut zip).map_err(io_err(path))?;
        entries.push(name.to_string());
    }
    zip.finish()?;

    tracing::info!("Archived {} logs into {}", entries.len(), output.display());
    Ok(ArchiveBundle {
        path: output.to_path_buf(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[tokio::test]
    async fn test_bundle_contains_only_logs_with_original_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["can0.csv", "channel_1.csv", "mpu6050.csv"] {
            fs::write(dir.path().join(name), format!("Timestamp\r\n{name}\r\n")).unwrap();
        }
        fs::write(dir.path().join("video_20240101_000000.h264"), b"\x00\x00").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let archiver = LogArchiver::new(dir.path(), "csv_data.zip");
        let bundle = archiver.bundle().await.unwrap();
        assert_eq!(bundle.entries, ["can0.csv", "channel_1.csv", "mpu6050.csv"]);

        let mut archive = zip::ZipArchive::new(File::open(&bundle.path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, ["can0.csv", "channel_1.csv", "mpu6050.csv"]);

        let mut contents = String::new();
        archive
            .by_name("mpu6050.csv")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "Timestamp\r\nmpu6050.csv\r\n");
    }

    #[tokio::test]
    async fn test_rebundle_does_not_include_previous_archive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("can1.csv"), "Timestamp,CAN ID,Data\r\n").unwrap();

        let archiver = LogArchiver::new(dir.path(), "csv_data.zip");
        archiver.bundle().await.unwrap();
        let bundle = archiver.bundle().await.unwrap();
        assert_eq!(bundle.entries, ["can1.csv"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = LogArchiver::new(dir.path().join("absent"), "csv_data.zip");
        assert!(matches!(
            archiver.bundle().await,
            Err(ArchiveError::Io { .. })
        ));
    }
}
