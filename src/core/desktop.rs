//! Synchronous façade
//!
//! Each operation is an independent snapshot-resolve-act sequence. Nothing is
//! kept between calls: no snapshot, no handle, no rectangle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::enumerator::{self, ApplicationFilter};
use super::geometry::{GeometryController, GeometryLimits, GeometrySettings};
use super::locator;
use super::snapshot::Snapshot;
use super::types::{BoundsChange, Pid, ProcessInfo, WindowGeometry};
use crate::backend::WindowSystem;
use crate::config::Config;
use crate::error::ServiceError;
use crate::process::ProcessDirectory;

#[derive(Debug, Clone, Default)]
pub struct DesktopSettings {
    pub filter: ApplicationFilter,
    pub geometry: GeometrySettings,
    /// Pause before the single retry of a failed snapshot capture
    pub enumeration_retry_backoff: Duration,
}

impl DesktopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: ApplicationFilter::new(&config.filter.ignored_titles, &config.filter.excluded_images),
            geometry: GeometrySettings {
                limits: GeometryLimits {
                    min_width: config.geometry.min_width,
                    min_height: config.geometry.min_height,
                },
                restore_settle: config.restore_settle(),
                retry_backoff: config.enumeration_retry_backoff(),
            },
            enumeration_retry_backoff: config.enumeration_retry_backoff(),
        }
    }
}

/// Blocking window geometry and process enumeration service
pub struct Desktop {
    system: Arc<dyn WindowSystem>,
    directory: Arc<dyn ProcessDirectory>,
    settings: DesktopSettings,
}

impl Desktop {
    pub fn new(system: Arc<dyn WindowSystem>, directory: Arc<dyn ProcessDirectory>, settings: DesktopSettings) -> Self {
        Self {
            system,
            directory,
            settings,
        }
    }

    fn snapshot(&self) -> Result<Snapshot, ServiceError> {
        Snapshot::capture(
            self.system.as_ref(),
            self.directory.as_ref(),
            self.settings.enumeration_retry_backoff,
        )
        .map_err(|e| ServiceError::os("enumerate windows", e.to_string()))
    }

    fn controller(&self) -> GeometryController<'_> {
        GeometryController::new(self.system.as_ref(), &self.settings.geometry)
    }

    pub fn list_application_processes(&self) -> Result<Vec<ProcessInfo>, ServiceError> {
        let snapshot = self.snapshot()?;
        Ok(enumerator::list_application_processes(&snapshot, &self.settings.filter))
    }

    pub fn list_all_processes_with_windows(&self) -> Result<Vec<ProcessInfo>, ServiceError> {
        let snapshot = self.snapshot()?;
        Ok(enumerator::list_all_processes_with_windows(&snapshot, &self.settings.filter))
    }

    pub fn get_window_info(&self, pid: Pid) -> Result<WindowGeometry, ServiceError> {
        let snapshot = self.snapshot()?;
        let window = locator::resolve(&snapshot, pid, &self.settings.filter)?;

        self.controller()
            .get_bounds(window.handle)
            .map_err(|e| ServiceError::from_backend(e, pid, "read window bounds"))
    }

    /// Resize the primary window of `pid`, keeping its origin.
    ///
    /// Nothing is sent to the window system once `deadline` has passed.
    pub fn set_window_size(&self, pid: Pid, width: i32, height: i32, deadline: Instant) -> Result<(), ServiceError> {
        let (width, height) = self.validate(pid, width, height)?;
        self.apply(pid, BoundsChange::Resize { width, height }, deadline)
    }

    /// Move and resize the primary window of `pid` in one request.
    pub fn set_window_position(
        &self,
        pid: Pid,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        deadline: Instant,
    ) -> Result<(), ServiceError> {
        let (width, height) = self.validate(pid, width, height)?;
        self.apply(pid, BoundsChange::MoveResize(WindowGeometry::new(x, y, width, height)), deadline)
    }

    fn validate(&self, pid: Pid, width: i32, height: i32) -> Result<(u32, u32), ServiceError> {
        self.settings
            .geometry
            .limits
            .validate(i64::from(width), i64::from(height))
            .map_err(|e| ServiceError::from_geometry(e, pid, "validate geometry"))
    }

    fn apply(&self, pid: Pid, change: BoundsChange, deadline: Instant) -> Result<(), ServiceError> {
        let snapshot = self.snapshot()?;
        let window = locator::resolve(&snapshot, pid, &self.settings.filter)?;

        tracing::debug!(pid, handle = %window.handle, ?change, "Setting window bounds");
        self.controller()
            .set_bounds(window.handle, change, deadline)
            .map_err(|e| ServiceError::from_geometry(e, pid, "set window bounds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryDesktop, MemoryWindow};

    fn desktop(memory: &Arc<MemoryDesktop>) -> Desktop {
        let settings = DesktopSettings {
            geometry: GeometrySettings {
                restore_settle: Duration::from_millis(100),
                retry_backoff: Duration::ZERO,
                ..GeometrySettings::default()
            },
            ..DesktopSettings::default()
        };
        Desktop::new(memory.clone(), memory.clone(), settings)
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn test_invalid_geometry_takes_precedence_over_stale_pid() {
        let memory = Arc::new(MemoryDesktop::new());
        let service = desktop(&memory);

        let err = service.set_window_size(404, 0, 100, later()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidGeometry { width: 0, .. }));
    }

    #[test]
    fn test_stale_pid_with_valid_geometry_is_process_not_found() {
        let memory = Arc::new(MemoryDesktop::new());
        let service = desktop(&memory);

        assert_eq!(
            service.set_window_position(404, 0, 0, 800, 600, later()),
            Err(ServiceError::ProcessNotFound { pid: 404 })
        );
        assert_eq!(service.get_window_info(404), Err(ServiceError::ProcessNotFound { pid: 404 }));
    }

    #[test]
    fn test_enumeration_failure_is_os_error() {
        let memory = Arc::new(MemoryDesktop::new());
        memory.fail_next_enumerations(2);
        let service = desktop(&memory);

        let err = service.list_application_processes().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OsError);
    }

    #[test]
    fn test_protected_window_is_permission_denied() {
        let memory = Arc::new(MemoryDesktop::new());
        memory.add_process(10, "elevated.exe");
        memory.add_window(MemoryWindow::new(1, 10).title("Admin").protected());
        let service = desktop(&memory);

        let err = service.set_window_size(10, 400, 300, later()).unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { pid: 10, .. }));
    }

    #[test]
    fn test_expired_deadline_is_os_error_without_mutation() {
        let memory = Arc::new(MemoryDesktop::new());
        memory.add_process(10, "editor");
        memory.add_window(MemoryWindow::new(1, 10).title("Main").bounds(0, 0, 800, 600));
        let service = desktop(&memory);

        let err = service.set_window_size(10, 300, 200, Instant::now()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OsError);
        assert!(err.to_string().contains("timed out"));
        assert_eq!(memory.bounds_requests(), 0);
        assert_eq!(memory.window(1).unwrap().normal_bounds, WindowGeometry::new(0, 0, 800, 600));
    }

    #[test]
    fn test_ignored_title_window_is_never_the_resize_target() {
        let memory = Arc::new(MemoryDesktop::new());
        memory.add_process(500, "explorer.exe");
        memory.add_window(MemoryWindow::new(1, 500).title("Program Manager").bounds(0, 0, 1920, 1080));
        memory.add_window(MemoryWindow::new(2, 500).title("Documents - File Explorer").bounds(200, 100, 900, 600));
        let service = Desktop::new(memory.clone(), memory.clone(), DesktopSettings::from_config(&Config::default()));

        let listed = service.list_application_processes().unwrap();
        assert_eq!(listed[0].window_title, "Documents - File Explorer");

        service.set_window_size(500, 640, 480, later()).unwrap();
        assert_eq!(memory.window(1).unwrap().normal_bounds, WindowGeometry::new(0, 0, 1920, 1080));
        assert_eq!(memory.window(2).unwrap().normal_bounds, WindowGeometry::new(200, 100, 640, 480));
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = Config::default();
        config.geometry.min_width = 120;
        config.os.enumeration_retry_backoff_ms = 7;

        let settings = DesktopSettings::from_config(&config);
        assert_eq!(settings.geometry.limits.min_width, 120);
        assert_eq!(settings.geometry.limits.min_height, 16);
        assert_eq!(settings.enumeration_retry_backoff, Duration::from_millis(7));
        assert!(settings.filter.is_excluded_image("CSRSS.EXE"));
    }
}
