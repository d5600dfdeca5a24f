//! Window system abstraction
//!
//! This module provides a platform-agnostic interface to the OS window
//! manager, with implementations for X11, Win32 and an in-memory desktop.
//! Every method is a blocking OS query; callers run them off the async
//! runtime.

pub mod memory;
#[cfg(windows)]
mod win32;
#[cfg(all(unix, not(target_os = "macos")))]
mod x11;

use std::sync::Arc;

use crate::core::types::{BoundsChange, ShowState, WindowGeometry, WindowHandle, WindowRecord};

/// Failure reported by a window system backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("window {0} no longer exists")]
    WindowGone(WindowHandle),

    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Contention-style failure that may succeed if issued again
    #[error("transient OS failure: {0}")]
    Transient(String),

    #[error("OS call failed: {0}")]
    Os(String),
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transient(_))
    }
}

/// Trait for window system implementations
pub trait WindowSystem: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Enumerate every top-level window, visible or not
    fn enumerate_windows(&self) -> Result<Vec<WindowRecord>, BackendError>;

    /// Read the OS-reported bounding rectangle in screen coordinates
    fn window_rect(&self, handle: WindowHandle) -> Result<WindowGeometry, BackendError>;

    /// Read whether the window is maximized, minimized or normal
    fn show_state(&self, handle: WindowHandle) -> Result<ShowState, BackendError>;

    /// Ask the window manager to return the window to its normal state
    fn restore(&self, handle: WindowHandle) -> Result<(), BackendError>;

    /// Apply a bounds change as a single OS request
    fn apply_bounds(&self, handle: WindowHandle, change: BoundsChange) -> Result<(), BackendError>;

    /// Rectangles of the attached monitors in screen coordinates
    fn monitors(&self) -> Result<Vec<WindowGeometry>, BackendError>;
}

/// Create the appropriate backend for the current environment
pub fn create_backend() -> anyhow::Result<Arc<dyn WindowSystem>> {
    #[cfg(windows)]
    {
        tracing::info!("Using Win32 backend");
        Ok(Arc::new(win32::Win32Backend::new()))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let display_env = std::env::var("DISPLAY").ok();

        if let Some(ref disp) = display_env {
            tracing::info!("Using X11 backend (DISPLAY={})", disp);
            Ok(Arc::new(x11::X11Backend::new()?))
        } else {
            anyhow::bail!("No display server detected. Set DISPLAY for X11 or XWayland.")
        }
    }

    #[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
    {
        anyhow::bail!("No window system backend is available for this platform")
    }
}
