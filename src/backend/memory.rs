//! In-memory desktop
//!
//! A scripted window system and process directory with no display server
//! behind it. It behaves like a cooperative window manager: maximized and
//! minimized windows refuse direct bounds changes until restored, protected
//! windows refuse every mutation, and failures or latency can be injected.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{BackendError, WindowSystem};
use crate::core::types::{BoundsChange, Pid, ShowState, WindowGeometry, WindowHandle, WindowRecord};
use crate::process::{ProcessDirectory, ProcessTable};

/// Default monitor used when none are configured
const PRIMARY_MONITOR: WindowGeometry = WindowGeometry::new(0, 0, 1920, 1080);

/// A window living on a [`MemoryDesktop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWindow {
    pub handle: WindowHandle,
    pub pid: Pid,
    pub title: String,
    pub visible: bool,
    pub tool: bool,
    pub show: ShowState,
    /// Bounds of the window in its normal (restored) state
    pub normal_bounds: WindowGeometry,
    /// Refuses every mutation, like an elevated window seen from a normal process
    pub protected: bool,
}

impl MemoryWindow {
    pub fn new(handle: u64, pid: Pid) -> Self {
        Self {
            handle: WindowHandle::from_raw(handle),
            pid,
            title: String::new(),
            visible: true,
            tool: false,
            show: ShowState::Normal,
            normal_bounds: WindowGeometry::new(100, 100, 800, 600),
            protected: false,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn bounds(mut self, x: i32, y: i32, width: u32, height: u32) -> Self {
        self.normal_bounds = WindowGeometry::new(x, y, width, height);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn tool(mut self) -> Self {
        self.tool = true;
        self
    }

    pub fn maximized(mut self) -> Self {
        self.show = ShowState::Maximized;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.show = ShowState::Minimized;
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

#[derive(Debug)]
struct DesktopState {
    windows: BTreeMap<WindowHandle, MemoryWindow>,
    processes: ProcessTable,
    monitors: Vec<WindowGeometry>,
    failing_enumerations: u32,
    failing_mutations: u32,
    latency: Duration,
    bounds_requests: usize,
    restores: usize,
}

impl DesktopState {
    fn window(&self, handle: WindowHandle) -> Result<&MemoryWindow, BackendError> {
        self.windows.get(&handle).ok_or(BackendError::WindowGone(handle))
    }

    fn window_mut(&mut self, handle: WindowHandle) -> Result<&mut MemoryWindow, BackendError> {
        self.windows.get_mut(&handle).ok_or(BackendError::WindowGone(handle))
    }

    fn primary_monitor(&self) -> WindowGeometry {
        self.monitors.first().copied().unwrap_or(PRIMARY_MONITOR)
    }

    /// Bounds as the OS would report them right now
    fn current_bounds(&self, window: &MemoryWindow) -> WindowGeometry {
        match window.show {
            ShowState::Normal | ShowState::Minimized => window.normal_bounds,
            ShowState::Maximized => self.primary_monitor(),
        }
    }
}

/// In-memory window system and process directory
#[derive(Debug)]
pub struct MemoryDesktop {
    state: Mutex<DesktopState>,
}

impl MemoryDesktop {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DesktopState {
                windows: BTreeMap::new(),
                processes: ProcessTable::new(),
                monitors: vec![PRIMARY_MONITOR],
                failing_enumerations: 0,
                failing_mutations: 0,
                latency: Duration::ZERO,
                bounds_requests: 0,
                restores: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DesktopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_process(&self, pid: Pid, image_name: &str) {
        self.state().processes.insert(pid, image_name.to_string());
    }

    /// Remove a process from the process table, leaving its windows behind
    pub fn remove_process(&self, pid: Pid) {
        self.state().processes.remove(&pid);
    }

    pub fn add_window(&self, window: MemoryWindow) {
        self.state().windows.insert(window.handle, window);
    }

    pub fn remove_window(&self, handle: u64) {
        self.state().windows.remove(&WindowHandle::from_raw(handle));
    }

    pub fn window(&self, handle: u64) -> Option<MemoryWindow> {
        self.state().windows.get(&WindowHandle::from_raw(handle)).cloned()
    }

    pub fn set_monitors(&self, monitors: Vec<WindowGeometry>) {
        self.state().monitors = monitors;
    }

    /// Make the next `count` window enumerations fail
    pub fn fail_next_enumerations(&self, count: u32) {
        self.state().failing_enumerations = count;
    }

    /// Make the next `count` bounds changes fail with a transient error
    pub fn fail_next_mutations(&self, count: u32) {
        self.state().failing_mutations = count;
    }

    /// Delay every window enumeration, simulating an unresponsive desktop
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Number of bounds changes that reached the window system
    pub fn bounds_requests(&self) -> usize {
        self.state().bounds_requests
    }

    pub fn restores(&self) -> usize {
        self.state().restores
    }
}

impl Default for MemoryDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSystem for MemoryDesktop {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn enumerate_windows(&self) -> Result<Vec<WindowRecord>, BackendError> {
        let latency = self.state().latency;
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        let mut state = self.state();
        if state.failing_enumerations > 0 {
            state.failing_enumerations -= 1;
            return Err(BackendError::Os("simulated enumeration failure".to_string()));
        }

        Ok(state
            .windows
            .values()
            .map(|w| WindowRecord {
                handle: w.handle,
                pid: w.pid,
                title: w.title.clone(),
                visible: w.visible && w.show != ShowState::Minimized,
                tool: w.tool,
                bounds: state.current_bounds(w),
            })
            .collect())
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowGeometry, BackendError> {
        let state = self.state();
        let window = state.window(handle)?;
        Ok(state.current_bounds(window))
    }

    fn show_state(&self, handle: WindowHandle) -> Result<ShowState, BackendError> {
        Ok(self.state().window(handle)?.show)
    }

    fn restore(&self, handle: WindowHandle) -> Result<(), BackendError> {
        let mut state = self.state();
        state.restores += 1;
        let window = state.window_mut(handle)?;
        if window.protected {
            return Err(BackendError::AccessDenied(format!("window {handle} is protected")));
        }
        window.show = ShowState::Normal;
        Ok(())
    }

    fn apply_bounds(&self, handle: WindowHandle, change: BoundsChange) -> Result<(), BackendError> {
        let mut state = self.state();
        state.bounds_requests += 1;

        if state.failing_mutations > 0 {
            state.failing_mutations -= 1;
            return Err(BackendError::Transient("simulated busy window manager".to_string()));
        }

        let window = state.window_mut(handle)?;
        if window.protected {
            return Err(BackendError::AccessDenied(format!("window {handle} is protected")));
        }
        if window.show != ShowState::Normal {
            return Err(BackendError::Os(format!(
                "window {handle} is {:?} and cannot be positioned",
                window.show
            )));
        }

        window.normal_bounds = match change {
            BoundsChange::Resize { width, height } => WindowGeometry {
                width,
                height,
                ..window.normal_bounds
            },
            BoundsChange::MoveResize(rect) => rect,
        };
        Ok(())
    }

    fn monitors(&self) -> Result<Vec<WindowGeometry>, BackendError> {
        Ok(self.state().monitors.clone())
    }
}

impl ProcessDirectory for MemoryDesktop {
    fn list_processes(&self) -> Result<ProcessTable, BackendError> {
        Ok(self.state().processes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximized_window_reports_monitor_bounds() {
        let desktop = MemoryDesktop::new();
        desktop.add_window(MemoryWindow::new(1, 10).bounds(5, 5, 300, 200).maximized());

        let handle = WindowHandle::from_raw(1);
        assert_eq!(desktop.window_rect(handle).unwrap(), PRIMARY_MONITOR);

        desktop.restore(handle).unwrap();
        assert_eq!(desktop.window_rect(handle).unwrap(), WindowGeometry::new(5, 5, 300, 200));
    }

    #[test]
    fn test_maximized_window_refuses_bounds() {
        let desktop = MemoryDesktop::new();
        desktop.add_window(MemoryWindow::new(1, 10).maximized());

        let result = desktop.apply_bounds(
            WindowHandle::from_raw(1),
            BoundsChange::Resize { width: 10, height: 10 },
        );
        assert!(matches!(result, Err(BackendError::Os(_))));
    }

    #[test]
    fn test_removed_window_is_gone() {
        let desktop = MemoryDesktop::new();
        desktop.add_window(MemoryWindow::new(7, 10));
        desktop.remove_window(7);

        assert_eq!(
            desktop.window_rect(WindowHandle::from_raw(7)),
            Err(BackendError::WindowGone(WindowHandle::from_raw(7)))
        );
    }

    #[test]
    fn test_enumeration_failures_are_consumed() {
        let desktop = MemoryDesktop::new();
        desktop.fail_next_enumerations(1);

        assert!(desktop.enumerate_windows().is_err());
        assert!(desktop.enumerate_windows().is_ok());
    }
}
