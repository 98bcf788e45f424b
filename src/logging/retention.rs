//! Log file retention management
//!
//! Rotates `name`, `name.1`, ... `name.N` and drops whatever falls past the backup count.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default number of rotated backups to keep
pub const DEFAULT_MAX_BACKUPS: usize = 1000;

/// Path of the `index`-th backup of `log_path` (`deferlog.log.3`)
pub fn backup_path(log_path: &Path, index: usize) -> PathBuf {
    let mut name = log_path.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Shift existing backups up by one and move `log_path` to `.1`
///
/// The oldest backup (`.max_backups`) is deleted. With `max_backups == 0` nothing
/// is rotated. Returns the number of files removed.
pub fn rotate_backups(log_path: &Path, max_backups: usize) -> io::Result<usize> {
    if max_backups == 0 {
        return Ok(0);
    }

    let mut deleted_count = 0;

    let oldest = backup_path(log_path, max_backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
        deleted_count += 1;
    }

    for index in (1..max_backups).rev() {
        let from = backup_path(log_path, index);
        if from.exists() {
            fs::rename(&from, backup_path(log_path, index + 1))?;
        }
    }

    if log_path.exists() {
        fs::rename(log_path, backup_path(log_path, 1))?;
    }

    Ok(deleted_count)
}

/// Remove backups numbered above `max_backups` (left over from a larger setting)
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs(log_path: &Path, max_backups: usize) -> io::Result<usize> {
    let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) else {
        return Ok(0);
    };
    if !dir.exists() {
        return Ok(0);
    }
    let prefix = format!("{}.", file_name.to_string_lossy());

    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // Only process numbered backups of this log file
        let Some(index) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };

        if index > max_backups && fs::remove_file(&path).is_ok() {
            deleted_count += 1;
        }
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_backup_path() {
        let path = backup_path(Path::new("/tmp/logs/deferlog.log"), 3);
        assert_eq!(path, PathBuf::from("/tmp/logs/deferlog.log.3"));
    }

    #[test]
    fn test_rotate_shifts_backups() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("deferlog.log");
        write(&log, "current");
        write(&backup_path(&log, 1), "previous");

        let deleted = rotate_backups(&log, 3).unwrap();

        assert_eq!(deleted, 0);
        assert!(!log.exists());
        assert_eq!(read(&backup_path(&log, 1)), "current");
        assert_eq!(read(&backup_path(&log, 2)), "previous");
    }

    #[test]
    fn test_rotate_drops_oldest() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("deferlog.log");
        write(&log, "current");
        write(&backup_path(&log, 1), "one");
        write(&backup_path(&log, 2), "two");

        let deleted = rotate_backups(&log, 2).unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(read(&backup_path(&log, 1)), "current");
        assert_eq!(read(&backup_path(&log, 2)), "one");
        assert!(!backup_path(&log, 3).exists());
    }

    #[test]
    fn test_rotate_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("deferlog.log");
        write(&log, "current");

        assert_eq!(rotate_backups(&log, 0).unwrap(), 0);
        assert_eq!(read(&log), "current");
    }

    #[test]
    fn test_cleanup_removes_excess_backups() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("deferlog.log");
        for i in 1..=4 {
            write(&backup_path(&log, i), "old");
        }

        let count = cleanup_old_logs(&log, 2).unwrap();
        assert_eq!(count, 2);
        assert!(backup_path(&log, 2).exists());
        assert!(!backup_path(&log, 3).exists());
    }

    #[test]
    fn test_cleanup_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("deferlog.log");
        let other = temp_dir.path().join("other.log.9");
        let not_numbered = temp_dir.path().join("deferlog.log.bak");
        write(&other, "x");
        write(&not_numbered, "x");

        assert_eq!(cleanup_old_logs(&log, 1).unwrap(), 0);
        assert!(other.exists());
        assert!(not_numbered.exists());
    }

    #[test]
    fn test_cleanup_nonexistent_dir() {
        let path = Path::new("/nonexistent/path/for/testing/deferlog.log");
        assert_eq!(cleanup_old_logs(path, 1).unwrap(), 0);
    }
}
