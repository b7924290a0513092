//! Browser process and profile lock cleanup.
//!
//! Lock-conflict errors ("browser is already running", a locked profile
//! directory) are not fixed by reconnecting. The stale browser holding the
//! profile has to go, and its singleton lock files with it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};

/// Chromium profile lock artifacts.
pub const PROFILE_LOCK_FILES: [&str; 3] = ["SingletonLock", "SingletonCookie", "SingletonSocket"];

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub terminated_pid: Option<u32>,
    pub removed_locks: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        self.terminated_pid.is_none() && self.removed_locks.is_empty()
    }
}

/// External cleanup collaborator for lock-conflict recovery.
pub trait ProcessSupervisor: Send + Sync {
    fn release_session(
        &self,
        account_id: &str,
        browser_pid: Option<u32>,
        session_path: Option<&Path>,
    ) -> CoreResult<CleanupReport>;
}

/// Kills stale browsers through `sysinfo` and removes profile locks.
#[derive(Debug, Default)]
pub struct SysinfoSupervisor;

impl SysinfoSupervisor {
    pub fn new() -> Self {
        Self
    }

    fn terminate(pid: u32) -> CoreResult<bool> {
        if pid == std::process::id() {
            return Err(CoreError::Process(format!("refusing to terminate own process {pid}")));
        }

        let target = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[target]));

        let Some(process) = system.process(target) else {
            debug!(pid, "browser process already gone");
            return Ok(false);
        };

        if process.kill() {
            Ok(true)
        } else {
            Err(CoreError::Process(format!("failed to signal browser process {pid}")))
        }
    }

    fn remove_locks(session_path: &Path) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for name in PROFILE_LOCK_FILES {
            let path = session_path.join(name);
            // symlink_metadata: SingletonLock is a dangling symlink on Linux
            if std::fs::symlink_metadata(&path).is_err() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove profile lock"),
            }
        }
        removed
    }
}

impl ProcessSupervisor for SysinfoSupervisor {
    fn release_session(
        &self,
        account_id: &str,
        browser_pid: Option<u32>,
        session_path: Option<&Path>,
    ) -> CoreResult<CleanupReport> {
        let mut report = CleanupReport::default();

        if let Some(pid) = browser_pid {
            if Self::terminate(pid)? {
                report.terminated_pid = Some(pid);
            }
        }

        if let Some(path) = session_path {
            report.removed_locks = Self::remove_locks(path);
        }

        info!(
            account_id,
            terminated_pid = ?report.terminated_pid,
            removed_locks = report.removed_locks.len(),
            "released stale browser session"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_profile_locks() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("SingletonLock"), "host-1234").unwrap();
        std::fs::write(tmp.path().join("SingletonCookie"), "").unwrap();
        std::fs::write(tmp.path().join("Preferences"), "{}").unwrap();

        let report = SysinfoSupervisor::new().release_session("sales", None, Some(tmp.path())).unwrap();

        assert_eq!(report.removed_locks.len(), 2);
        assert!(!tmp.path().join("SingletonLock").exists());
        assert!(tmp.path().join("Preferences").exists());
        assert_eq!(report.terminated_pid, None);
    }

    #[test]
    fn test_refuses_own_pid() {
        let result = SysinfoSupervisor::new().release_session("sales", Some(std::process::id()), None);
        assert!(matches!(result, Err(CoreError::Process(_))));
    }

    #[test]
    fn test_nothing_to_release() {
        let report = SysinfoSupervisor::new().release_session("sales", None, None).unwrap();
        assert!(report.is_empty());
    }
}
