//! Reading and writing window bounds
//!
//! The controller only ever acts on a handle resolved moments earlier from a
//! fresh snapshot. It never clamps what it reads and never clamps origins it
//! writes; the only thing it rejects is an extent below the configured floor.

use std::time::{Duration, Instant};

use super::retry::retry_once;
use super::types::{BoundsChange, ShowState, WindowGeometry, WindowHandle};
use crate::backend::{BackendError, WindowSystem};

const RESTORE_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("extent {width}x{height} is below the minimum {min_width}x{min_height}")]
    InvalidGeometry {
        width: i64,
        height: i64,
        min_width: u32,
        min_height: u32,
    },

    /// The caller's deadline passed before `stage`; nothing was changed from there on
    #[error("timed out before {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GeometryError {
    fn is_transient(&self) -> bool {
        matches!(self, GeometryError::Backend(e) if e.is_transient())
    }
}

/// Whether `target` overlaps at least one of `monitors`.
///
/// Monitors left of or above the primary one carry negative origins.
pub fn intersects_any(monitors: &[WindowGeometry], target: &WindowGeometry) -> bool {
    monitors.iter().any(|monitor| target.intersects(monitor))
}

fn check_deadline(deadline: Instant, stage: &'static str) -> Result<(), GeometryError> {
    if Instant::now() >= deadline {
        tracing::warn!(stage, "Deadline passed, abandoning window change");
        return Err(GeometryError::DeadlineExceeded { stage });
    }
    Ok(())
}

/// Smallest extent the controller will ever ask the OS for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLimits {
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            min_width: 16,
            min_height: 16,
        }
    }
}

impl GeometryLimits {
    /// Check a caller-supplied extent and convert it to unsigned pixels.
    pub fn validate(&self, width: i64, height: i64) -> Result<(u32, u32), GeometryError> {
        let invalid = || GeometryError::InvalidGeometry {
            width,
            height,
            min_width: self.min_width,
            min_height: self.min_height,
        };

        let w = u32::try_from(width).map_err(|_| invalid())?;
        let h = u32::try_from(height).map_err(|_| invalid())?;
        if w == 0 || h == 0 || w < self.min_width || h < self.min_height {
            return Err(invalid());
        }
        Ok((w, h))
    }
}

#[derive(Debug, Clone)]
pub struct GeometrySettings {
    pub limits: GeometryLimits,
    /// How long to wait for the window manager to report a restored window
    pub restore_settle: Duration,
    /// Pause before re-issuing a mutation that failed transiently
    pub retry_backoff: Duration,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            limits: GeometryLimits::default(),
            restore_settle: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(50),
        }
    }
}

pub struct GeometryController<'a> {
    system: &'a dyn WindowSystem,
    settings: &'a GeometrySettings,
}

impl<'a> GeometryController<'a> {
    pub fn new(system: &'a dyn WindowSystem, settings: &'a GeometrySettings) -> Self {
        Self { system, settings }
    }

    /// OS-reported rectangle in screen coordinates, unmodified
    pub fn get_bounds(&self, handle: WindowHandle) -> Result<WindowGeometry, BackendError> {
        self.system.window_rect(handle)
    }

    /// Apply `change` to the window.
    ///
    /// The extent is validated before any OS call. A maximized or minimized
    /// window is restored first; a resize then keeps the restored origin.
    /// Once `deadline` has passed no further restore or bounds request is
    /// issued and [`GeometryError::DeadlineExceeded`] is returned.
    pub fn set_bounds(
        &self,
        handle: WindowHandle,
        change: BoundsChange,
        deadline: Instant,
    ) -> Result<(), GeometryError> {
        let (width, height) = change.extent();
        self.settings.limits.validate(i64::from(width), i64::from(height))?;

        check_deadline(deadline, "restore")?;
        self.ensure_normal(handle, deadline)?;

        if let BoundsChange::MoveResize(target) = change {
            self.warn_if_off_screen(handle, &target);
        }

        retry_once("apply bounds", self.settings.retry_backoff, GeometryError::is_transient, || {
            check_deadline(deadline, "apply bounds")?;
            Ok(self.system.apply_bounds(handle, change)?)
        })?;

        tracing::info!(%handle, ?change, "Applied window bounds");
        Ok(())
    }

    fn ensure_normal(&self, handle: WindowHandle, deadline: Instant) -> Result<(), BackendError> {
        let state = self.system.show_state(handle)?;
        if state == ShowState::Normal {
            return Ok(());
        }

        tracing::info!(%handle, ?state, "Restoring window before applying bounds");
        self.system.restore(handle)?;

        let start = Instant::now();
        loop {
            if self.system.show_state(handle)? == ShowState::Normal {
                tracing::debug!(%handle, elapsed = ?start.elapsed(), "Window restored");
                return Ok(());
            }
            if start.elapsed() >= self.settings.restore_settle || Instant::now() >= deadline {
                // Some window managers update their state hints late; the
                // bounds request itself reports a refusal.
                tracing::warn!(
                    %handle,
                    ?state,
                    settle_ms = self.settings.restore_settle.as_millis() as u64,
                    "Window still reports non-normal state after restore"
                );
                return Ok(());
            }
            std::thread::sleep(RESTORE_POLL_INTERVAL);
        }
    }

    fn warn_if_off_screen(&self, handle: WindowHandle, target: &WindowGeometry) {
        match self.system.monitors() {
            Ok(monitors) if !monitors.is_empty() => {
                if !intersects_any(&monitors, target) {
                    tracing::warn!(
                        %handle,
                        x = target.x,
                        y = target.y,
                        width = target.width,
                        height = target.height,
                        monitors = monitors.len(),
                        "Target rectangle does not intersect any monitor"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(%handle, "Could not read monitor layout: {}", e),
        }
    }
}
