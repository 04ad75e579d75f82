//! Backup compression
//!
//! Packs the raw backup stream into a single-entry zip archive stamped
//! with the run time. Compression is CPU-bound and runs on the blocking
//! pool.

use crate::config::OutputConfig;
use crate::Result;
use chrono::{Datelike, Timelike};
use std::fs::File;
use std::io::BufReader;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the single entry inside the archive
pub const ARCHIVE_ENTRY_NAME: &str = "backup.xml";

/// Compresses the backup artifact into the archive artifact
///
/// Returns the archive size in bytes.
pub async fn compress_backup(output: &OutputConfig) -> Result<u64> {
    let source = output.backup_path.clone();
    let target = output.archive_path.clone();
    let buffer_size = output.buffer_size;

    tokio::task::spawn_blocking(move || compress_file(&source, &target, buffer_size)).await?
}

/// Writes a single-entry archive containing the source file
pub fn compress_file(source: &str, target: &str, buffer_size: usize) -> Result<u64> {
    tracing::info!("Compressing '{}' into '{}'", source, target);

    let mut input = BufReader::with_capacity(buffer_size, File::open(source)?);
    let mut zip = ZipWriter::new(File::create(target)?);

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(archive_timestamp());
    zip.start_file(ARCHIVE_ENTRY_NAME, options)?;
    std::io::copy(&mut input, &mut zip)?;

    let file = zip.finish()?;
    let size = file.metadata()?.len();
    tracing::info!("Archive finished at {} byte(s)", size);
    Ok(size)
}

/// Current local time as a zip entry timestamp
fn archive_timestamp() -> zip::DateTime {
    let now = chrono::Local::now();
    zip::DateTime::from_date_and_time(
        now.year() as u16,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[tokio::test]
    async fn test_compress_backup_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backup_path = dir.path().join("backup.xml");
        let archive_path = dir.path().join("backup.zip");
        let content = "<mediawiki>".to_string() + &"page ".repeat(2048) + "</mediawiki>";
        std::fs::write(&backup_path, &content).unwrap();

        let output = OutputConfig {
            map_path: String::new(),
            manifest_path: String::new(),
            backup_path: backup_path.to_string_lossy().into_owned(),
            archive_path: archive_path.to_string_lossy().into_owned(),
            trace_path: String::new(),
            buffer_size: 1024,
        };

        let size = compress_backup(&output).await.unwrap();
        assert!(size > 0);
        assert_eq!(size, std::fs::metadata(&archive_path).unwrap().len());

        // Repetitive input must actually shrink
        assert!(size < content.len() as u64);

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), ARCHIVE_ENTRY_NAME);

        let mut restored = String::new();
        entry.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, content);
    }

    #[test]
    fn test_compress_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("backup.zip");
        let result = compress_file(
            "/nonexistent/backup.xml",
            &target.to_string_lossy(),
            1024,
        );
        assert!(result.is_err());
    }
}
