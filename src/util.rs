//! File permission helpers

use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Create a temporary file readable and writable only by its owner (mode 0600)
///
/// The file is deleted when the returned handle (or its `TempPath`) is dropped,
/// unless it is explicitly kept.
pub fn secure_temp_file(prefix: &str) -> io::Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".log")
        .tempfile()?;

    // Exactly 0600, whatever the umask
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}

/// Check that `path` has exactly the permission bits `mode` and is owned by `uid`
#[cfg(unix)]
pub fn check_permissions(path: &Path, mode: u32, uid: u32) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let metadata = std::fs::metadata(path)?;
    Ok(metadata.mode() & 0o777 == mode && metadata.uid() == uid)
}

/// Permission bits are not tracked on this platform; only existence is checked
#[cfg(not(unix))]
pub fn check_permissions(path: &Path, _mode: u32, _uid: u32) -> io::Result<bool> {
    std::fs::metadata(path).map(|_| true)
}

/// User id of the current process
#[cfg(unix)]
pub fn current_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
pub fn current_uid() -> u32 {
    0
}
