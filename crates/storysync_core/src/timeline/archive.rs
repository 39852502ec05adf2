//! Zip container access for timeline documents.

use crate::backup::write_with_backup;
use crate::timeline::TimelineError;
use log::info;
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive entry holding the timeline JSON.
pub const TIMELINE_ENTRY: &str = "timeline.json";

/// Reads and parses the timeline JSON from the archive at `path`.
pub fn open_timeline(path: &Path) -> Result<Value, TimelineError> {
    let file = File::open(path).map_err(|source| TimelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = archive.by_name(TIMELINE_ENTRY)?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|source| TimelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if text.trim().is_empty() {
        return Err(TimelineError::MissingData);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Writes `json` as a fresh deflated archive at `path`.
///
/// An existing file is kept as `<path>.bak` and restored on failure.
pub fn save_timeline(json: &Value, path: &Path) -> Result<(), TimelineError> {
    write_with_backup(path, |target| write_archive(json, target)).map_err(|err| {
        TimelineError::WriteFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;
    info!(
        "event=timeline_saved module=timeline status=ok path={}",
        path.display()
    );
    Ok(())
}

fn write_archive(json: &Value, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(TIMELINE_ENTRY, options)?;
    let payload = serde_json::to_vec(json)?;
    zip.write_all(&payload)?;
    zip.finish()?.sync_all()
}
