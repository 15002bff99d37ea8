use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a writer waits for another `gt` process before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory lock on the gantry directory, held for the duration of a
/// read-modify-write of `projects.json`.
///
/// Uses `flock` so the terminal view and CLI invocations never interleave
/// their upserts.
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path}: another gt process is writing")]
    Timeout { path: PathBuf },
}

impl StoreLock {
    /// Acquire the lock, polling until `timeout` elapses
    pub fn acquire(gantry_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = gantry_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Create {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        while try_flock(&file).is_err() {
            if started.elapsed() >= timeout {
                return Err(LockError::Timeout { path });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        log::debug!("acquired {}", path.display());
        Ok(StoreLock { _file: file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // flock is released with the descriptor
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_flock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_flock(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_reacquirable_after_drop() {
        let tmp = TempDir::new().unwrap();
        let first = StoreLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).unwrap();
        drop(first);
        assert!(StoreLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_writer_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = StoreLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).unwrap();
        let err = StoreLock::acquire(tmp.path(), Duration::from_millis(40)).err().unwrap();
        assert!(matches!(err, LockError::Timeout { .. }));
    }
}
