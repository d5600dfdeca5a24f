//! Async service façade
//!
//! The blocking [`Desktop`] operations run on tokio's blocking pool, each
//! bounded by a timeout so one unresponsive window cannot stall a caller.
//! The same timeout is handed to the blocking task as a deadline, so a call
//! reported as timed out does not go on to move or resize the window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::core::desktop::Desktop;
use crate::core::types::{Pid, ProcessInfo, WindowGeometry};
use crate::error::ServiceError;

/// The five operations exposed to callers
#[async_trait]
pub trait WindowService: Send + Sync {
    async fn list_application_processes(&self) -> Result<Vec<ProcessInfo>, ServiceError>;

    /// Unfiltered listing for diagnosing why a process is missing above
    async fn list_all_processes_with_windows(&self) -> Result<Vec<ProcessInfo>, ServiceError>;

    async fn get_window_info(&self, pid: Pid) -> Result<WindowGeometry, ServiceError>;

    async fn set_window_size(&self, pid: Pid, width: i32, height: i32) -> Result<(), ServiceError>;

    async fn set_window_position(
        &self,
        pid: Pid,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), ServiceError>;
}

/// [`WindowService`] backed by a [`Desktop`]
#[derive(Clone)]
pub struct GeometryService {
    desktop: Arc<Desktop>,
    call_timeout: Duration,
}

impl GeometryService {
    pub fn new(desktop: Desktop, call_timeout: Duration) -> Self {
        Self {
            desktop: Arc::new(desktop),
            call_timeout,
        }
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Desktop, Instant) -> Result<T, ServiceError> + Send + 'static,
    {
        let desktop = self.desktop.clone();
        let deadline = Instant::now() + self.call_timeout;
        let task = tokio::task::spawn_blocking(move || f(&desktop, deadline));

        match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => {
                if let Err(e) = &result {
                    tracing::warn!(operation, code = e.error_code(), "{}", e);
                }
                result
            }
            Ok(Err(join_error)) => {
                tracing::error!(operation, "Blocking task failed: {}", join_error);
                Err(ServiceError::os(operation, join_error.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "OS call timed out"
                );
                Err(ServiceError::os(
                    operation,
                    format!("timed out after {}ms", self.call_timeout.as_millis()),
                ))
            }
        }
    }
}

#[async_trait]
impl WindowService for GeometryService {
    async fn list_application_processes(&self) -> Result<Vec<ProcessInfo>, ServiceError> {
        self.run("list application processes", |desktop, _| desktop.list_application_processes())
            .await
    }

    async fn list_all_processes_with_windows(&self) -> Result<Vec<ProcessInfo>, ServiceError> {
        self.run("list all processes with windows", |desktop, _| {
            desktop.list_all_processes_with_windows()
        })
        .await
    }

    async fn get_window_info(&self, pid: Pid) -> Result<WindowGeometry, ServiceError> {
        self.run("get window info", move |desktop, _| desktop.get_window_info(pid))
            .await
    }

    async fn set_window_size(&self, pid: Pid, width: i32, height: i32) -> Result<(), ServiceError> {
        self.run("set window size", move |desktop, deadline| {
            desktop.set_window_size(pid, width, height, deadline)
        })
        .await
    }

    async fn set_window_position(
        &self,
        pid: Pid,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), ServiceError> {
        self.run("set window position", move |desktop, deadline| {
            desktop.set_window_position(pid, x, y, width, height, deadline)
        })
        .await
    }
}
