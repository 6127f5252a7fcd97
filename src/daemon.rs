//! PID-file based start/stop/status control.
//!
//! The running daemon holds an exclusive advisory lock on the PID file for
//! its whole lifetime, so liveness can be told apart from a stale file left
//! by a crash: a readable PID whose lock is free is stale, not running.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;

/// Errors from daemon lifecycle control
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Daemon already running (pid {pid}, pid file {path})")]
    AlreadyRunning { path: PathBuf, pid: i32 },

    #[error("Daemon is not running (pid file {0})")]
    NotRunning(PathBuf),

    #[error("Pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Pid file {0} holds no readable pid")]
    Unreadable(PathBuf),

    #[error("Failed to signal pid {pid}: {source}")]
    Signal { pid: i32, source: nix::Error },
}

/// Daemon liveness as far as the PID file can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    NotRunning,
    Running(i32),
    /// A PID file exists but nothing holds its lock
    Stale(i32),
}

/// An acquired PID file. Holding this value holds the lock; dropping it
/// removes the file.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    // Keeps the advisory lock alive
    _file: File,
}

impl PidFile {
    /// Create (or take over a stale) PID file and lock it exclusively.
    pub fn acquire(path: &Path) -> Result<PidFile, DaemonError> {
        let io_err = |source| DaemonError::PidFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(io_err)?;

        if file.try_lock_exclusive().is_err() {
            let pid = read_pid_from(&mut file).unwrap_or(0);
            return Err(DaemonError::AlreadyRunning {
                path: path.to_path_buf(),
                pid,
            });
        }

        file.set_len(0).map_err(io_err)?;
        file.rewind().map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        Ok(PidFile {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // The lock dies with the file handle either way
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Report daemon liveness for the given PID file path.
pub fn status(path: &Path) -> Result<DaemonStatus, DaemonError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DaemonStatus::NotRunning)
        }
        Err(source) => {
            return Err(DaemonError::PidFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let pid = read_pid_from(&mut file).ok_or_else(|| DaemonError::Unreadable(path.to_path_buf()))?;

    if file.try_lock_shared().is_ok() {
        let _ = fs2::FileExt::unlock(&file);
        return Ok(DaemonStatus::Stale(pid));
    }

    Ok(DaemonStatus::Running(pid))
}

/// Ask a running daemon to stop by sending SIGTERM. The daemon finishes its
/// current cycle before exiting.
pub fn stop(path: &Path) -> Result<i32, DaemonError> {
    match status(path)? {
        DaemonStatus::Running(pid) => {
            kill(Pid::from_raw(pid), Some(Signal::SIGTERM))
                .map_err(|source| DaemonError::Signal { pid, source })?;
            Ok(pid)
        }
        DaemonStatus::NotRunning | DaemonStatus::Stale(_) => {
            Err(DaemonError::NotRunning(path.to_path_buf()))
        }
    }
}

fn read_pid_from(file: &mut File) -> Option<i32> {
    let mut content = String::new();
    file.rewind().ok()?;
    file.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_writes_own_pid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wavegate.pid");

        let pidfile = PidFile::acquire(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());

        drop(pidfile);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_reports_running() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wavegate.pid");

        let _held = PidFile::acquire(&path).unwrap();
        let err = PidFile::acquire(&path).unwrap_err();

        match err {
            DaemonError::AlreadyRunning { pid, .. } => {
                assert_eq!(pid, std::process::id() as i32);
            }
            other => panic!("Expected AlreadyRunning, got {other:?}"),
        }
    }

    #[test]
    fn test_status_transitions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wavegate.pid");

        assert_eq!(status(&path).unwrap(), DaemonStatus::NotRunning);

        let pidfile = PidFile::acquire(&path).unwrap();
        assert_eq!(
            status(&path).unwrap(),
            DaemonStatus::Running(std::process::id() as i32)
        );

        drop(pidfile);
        assert_eq!(status(&path).unwrap(), DaemonStatus::NotRunning);
    }

    #[test]
    fn test_unlocked_pid_file_is_stale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wavegate.pid");
        std::fs::write(&path, "12345\n").unwrap();

        assert_eq!(status(&path).unwrap(), DaemonStatus::Stale(12345));
    }

    #[test]
    fn test_stop_without_daemon_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wavegate.pid");

        assert!(matches!(stop(&path), Err(DaemonError::NotRunning(_))));
    }
}
