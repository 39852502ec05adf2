//! Backup-guarded file replacement shared by both document writers.
//!
//! # Invariants
//! - An existing file is moved to `<path>.bak` before the new content is
//!   written; the backup stays in place after a successful write.
//! - When the write fails, the backup is moved back so the on-disk state is
//!   never worse than before the run.

use log::{error, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Returns the backup sibling of `path` (`<path>.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Runs `write` against `path` with the previous file moved aside first.
///
/// Restoration is best effort: failure to restore is logged and the
/// original write error is returned.
pub(crate) fn write_with_backup<E, F>(path: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(&Path) -> Result<(), E>,
    E: From<std::io::Error>,
{
    let backup = backup_path(path);
    let backed_up = if path.is_file() {
        std::fs::rename(path, &backup)?;
        true
    } else {
        false
    };

    let result = write(path);
    if result.is_err() && backed_up {
        match std::fs::rename(&backup, path) {
            Ok(()) => warn!(
                "event=backup_restored module=backup status=ok path={}",
                path.display()
            ),
            Err(err) => error!(
                "event=backup_restored module=backup status=error path={} error={}",
                path.display(),
                err
            ),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{backup_path, write_with_backup};
    use std::path::{Path, PathBuf};

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/books/novel.yw7")),
            PathBuf::from("/books/novel.yw7.bak")
        );
    }

    #[test]
    fn successful_write_keeps_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("story.aeonzip");
        std::fs::write(&path, "old").expect("seed file");

        write_with_backup::<std::io::Error, _>(&path, |target| std::fs::write(target, "new"))
            .expect("write succeeds");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new");
        assert_eq!(
            std::fs::read_to_string(backup_path(&path)).expect("read backup"),
            "old"
        );
    }

    #[test]
    fn failed_write_restores_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("story.yw7");
        std::fs::write(&path, "old").expect("seed file");

        let result = write_with_backup::<std::io::Error, _>(&path, |target| {
            std::fs::write(target, "partial")?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "old");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn missing_file_is_written_without_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh.yw7");

        write_with_backup::<std::io::Error, _>(&path, |target| std::fs::write(target, "new"))
            .expect("write succeeds");

        assert!(path.is_file());
        assert!(!backup_path(&path).exists());
    }
}
