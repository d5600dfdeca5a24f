//! OS process directory backed by sysinfo
//!
//! Read-only listing of running process ids and their image names. The
//! table is rebuilt on every call; nothing is cached between façade calls.

use std::collections::BTreeMap;

use sysinfo::{ProcessesToUpdate, System};

use crate::backend::BackendError;
use crate::core::types::Pid;

/// Running processes keyed by pid, valued by image name
pub type ProcessTable = BTreeMap<Pid, String>;

/// Source of the OS process list
pub trait ProcessDirectory: Send + Sync {
    fn list_processes(&self) -> Result<ProcessTable, BackendError>;
}

/// Process directory using a fresh `sysinfo::System` per listing
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoDirectory;

impl ProcessDirectory for SysinfoDirectory {
    fn list_processes(&self) -> Result<ProcessTable, BackendError> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let table: ProcessTable = system
            .processes()
            .iter()
            .map(|(pid, process)| (pid.as_u32(), process.name().to_string_lossy().into_owned()))
            .collect();

        if table.is_empty() {
            // Every real OS has at least this process running
            return Err(BackendError::Os("process table is empty".to_string()));
        }

        tracing::trace!("Listed {} processes", table.len());
        Ok(table)
    }
}
