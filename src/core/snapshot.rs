//! Point-in-time view of the OS window table and process table
//!
//! A snapshot is captured fresh for every façade call and dropped when the
//! call returns. Handles inside it are lookup keys for that call only.

use std::collections::BTreeMap;
use std::time::Duration;

use super::retry::retry_once;
use super::types::{Pid, WindowRecord};
use crate::backend::{BackendError, WindowSystem};
use crate::process::{ProcessDirectory, ProcessTable};

/// Immutable enumeration result
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    windows: Vec<WindowRecord>,
    processes: ProcessTable,
}

impl Snapshot {
    pub fn new(windows: Vec<WindowRecord>, processes: ProcessTable) -> Self {
        Self { windows, processes }
    }

    /// Enumerate windows, then processes.
    ///
    /// Windows are read first so that a process which exits between the two
    /// reads is seen as gone rather than as a live process with windows. An
    /// OS-level failure in either read retries the whole capture once after
    /// `retry_backoff`; access and handle errors are not retried. Partial
    /// snapshots are never returned.
    pub fn capture(
        system: &dyn WindowSystem,
        directory: &dyn ProcessDirectory,
        retry_backoff: Duration,
    ) -> Result<Self, BackendError> {
        let snapshot = retry_once("snapshot capture", retry_backoff, is_os_failure, || {
            let windows = system.enumerate_windows()?;
            let processes = directory.list_processes()?;
            Ok(Self::new(windows, processes))
        })?;

        tracing::debug!(
            backend = system.name(),
            windows = snapshot.windows.len(),
            processes = snapshot.processes.len(),
            "Captured snapshot"
        );
        Ok(snapshot)
    }

    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    pub fn process_exists(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn image_name(&self, pid: Pid) -> Option<&str> {
        self.processes.get(&pid).map(String::as_str)
    }

    /// Windows owned by `pid`, in enumeration order
    pub fn windows_of(&self, pid: Pid) -> Vec<&WindowRecord> {
        self.windows.iter().filter(|w| w.pid == pid).collect()
    }

    /// Windows grouped by owning pid, restricted to processes that are
    /// present in the process table
    pub fn windows_by_process(&self) -> BTreeMap<Pid, Vec<&WindowRecord>> {
        let mut groups: BTreeMap<Pid, Vec<&WindowRecord>> = BTreeMap::new();
        for window in self.windows.iter().filter(|w| self.process_exists(w.pid)) {
            groups.entry(window.pid).or_default().push(window);
        }
        groups
    }
}

fn is_os_failure(err: &BackendError) -> bool {
    matches!(err, BackendError::Os(_) | BackendError::Transient(_))
}
