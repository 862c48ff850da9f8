//! Exclusive per-package write lock, adapted from the file-locking scheme
//! used for xchecker's per-spec lock directories: an atomically created
//! `create_new` lock file holding the owning process descriptor, backed
//! by an fd-level lock for the lifetime of the writer, with stale-lock
//! reclamation by checking the holder's PID liveness.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    hostname: String,
    started_at: u64,
}

/// Held for the duration of a write to a package's seed tables. Dropping
/// it releases the fd lock and removes the lock file.
pub struct PackageLock {
    path: PathBuf,
    _fd_lock: RwLock<fs::File>,
}

impl PackageLock {
    /// Acquires the lock at `seed_root/.lock`, reclaiming it first if the
    /// existing holder's pid is no longer alive.
    pub fn acquire(seed_root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(seed_root).map_err(|e| StoreError::io(seed_root, e))?;
        let path = seed_root.join(".lock");

        match fs::OpenOptions::new().create_new(true).write(true).open(&path) {
            Ok(file) => Self::finalize(path, file),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if Self::is_stale(&path)? {
                    fs::remove_file(&path).ok();
                    let file = fs::OpenOptions::new()
                        .create_new(true)
                        .write(true)
                        .open(&path)
                        .map_err(|e| StoreError::io(path.clone(), e))?;
                    Self::finalize(path, file)
                } else {
                    let pid = Self::read_info(&path).map(|info| info.pid).unwrap_or(0);
                    Err(StoreError::WriteBusy { path, pid })
                }
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn finalize(path: PathBuf, file: fs::File) -> Result<Self, StoreError> {
        let info = LockInfo {
            pid: std::process::id(),
            hostname: hostname(),
            started_at: now_secs(),
        };
        let mut fd_lock = RwLock::new(file);
        {
            let mut guard = fd_lock.try_write().map_err(|_| StoreError::WriteBusy {
                path: path.clone(),
                pid: 0,
            })?;
            use std::io::Write;
            serde_json::to_writer(&mut *guard, &info)
                .map_err(|e| StoreError::io(path.clone(), std::io::Error::other(e)))?;
            guard.flush().map_err(|e| StoreError::io(path.clone(), e))?;
        }
        Ok(Self { path, _fd_lock: fd_lock })
    }

    fn read_info(path: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn is_stale(path: &Path) -> Result<bool, StoreError> {
        match Self::read_info(path) {
            // Unreadable/corrupt lock file: treat as stale so a crash doesn't wedge writers forever.
            None => Ok(true),
            Some(info) => Ok(!pid_is_alive(info.pid)),
        }
    }
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        fs::remove_file(&self.path).ok();
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::fs::read_to_string("/etc/hostname").map(|s| s.trim().to_string()))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Liveness check via `/proc/<pid>`, per the store's lockfile design.
/// Always reports a lock as live on non-Linux targets, since there is no
/// portable equivalent; reclamation there falls back to an operator
/// manually removing the lock file.
#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let _first = PackageLock::acquire(dir.path()).unwrap();
        let second = PackageLock::acquire(dir.path());
        assert!(matches!(second, Err(StoreError::WriteBusy { .. })));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = PackageLock::acquire(dir.path()).unwrap();
        }
        let second = PackageLock::acquire(dir.path());
        assert!(second.is_ok());
    }
}
