//! Win32 window system backend

use std::mem;

use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_BUSY, ERROR_INVALID_WINDOW_HANDLE, ERROR_TIMEOUT, HWND, LPARAM,
    RECT,
};
use windows::Win32::Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO};
use windows::Win32::UI::HiDpi::{
    DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GWL_EXSTYLE, GetWindowLongPtrW, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindowVisible, IsZoomed, SW_RESTORE,
    SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOZORDER, SetWindowPos, ShowWindow, WS_EX_TOOLWINDOW,
};
use windows::core::{BOOL, HRESULT};

use super::{BackendError, WindowSystem};
use crate::core::types::{BoundsChange, ShowState, WindowGeometry, WindowHandle, WindowRecord};

/// Win32 window backend
pub struct Win32Backend;

impl Win32Backend {
    /// Create the backend and declare per-monitor DPI awareness (V2).
    ///
    /// Without it Windows virtualizes coordinates against the primary
    /// monitor's DPI, so rectangles read and written on a mixed-DPI layout
    /// would not be raw screen pixels.
    pub fn new() -> Self {
        // SAFETY: SetProcessDpiAwarenessContext is safe to call at startup.
        // If it fails (already set via manifest), we ignore the error.
        unsafe {
            let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
        }
        Self
    }
}

impl WindowSystem for Win32Backend {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn enumerate_windows(&self) -> Result<Vec<WindowRecord>, BackendError> {
        let mut handles: Vec<HWND> = Vec::new();

        // SAFETY: EnumWindows runs synchronously and the Vec outlives the
        // call; the callback casts the LPARAM back to &mut Vec<HWND>.
        unsafe {
            EnumWindows(Some(collect_window), LPARAM(&mut handles as *mut _ as isize))
                .map_err(|e| map_error(None, e))?;
        }

        let mut windows = Vec::with_capacity(handles.len());
        for hwnd in handles {
            match read_record(hwnd) {
                Ok(record) => windows.push(record),
                Err(BackendError::WindowGone(handle)) => {
                    tracing::debug!("Window {} vanished during enumeration", handle);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(windows)
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowGeometry, BackendError> {
        rect_of(to_hwnd(handle))
    }

    fn show_state(&self, handle: WindowHandle) -> Result<ShowState, BackendError> {
        let hwnd = to_hwnd(handle);
        // Fails with WindowGone if the handle is stale
        rect_of(hwnd)?;

        // SAFETY: IsIconic and IsZoomed are simple state queries.
        let state = unsafe {
            if IsIconic(hwnd).as_bool() {
                ShowState::Minimized
            } else if IsZoomed(hwnd).as_bool() {
                ShowState::Maximized
            } else {
                ShowState::Normal
            }
        };
        Ok(state)
    }

    fn restore(&self, handle: WindowHandle) -> Result<(), BackendError> {
        let hwnd = to_hwnd(handle);
        rect_of(hwnd)?;

        // SAFETY: ShowWindow with a valid HWND is safe. The return value is
        // the previous visibility, not an error indicator.
        unsafe {
            let _ = ShowWindow(hwnd, SW_RESTORE);
        }
        Ok(())
    }

    fn apply_bounds(&self, handle: WindowHandle, change: BoundsChange) -> Result<(), BackendError> {
        let hwnd = to_hwnd(handle);

        let (x, y, width, height, flags) = match change {
            BoundsChange::Resize { width, height } => {
                (0, 0, width, height, SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE)
            }
            BoundsChange::MoveResize(rect) => {
                (rect.x, rect.y, rect.width, rect.height, SWP_NOZORDER | SWP_NOACTIVATE)
            }
        };
        let cx = i32::try_from(width).map_err(|_| BackendError::Os(format!("width {width} out of range")))?;
        let cy = i32::try_from(height).map_err(|_| BackendError::Os(format!("height {height} out of range")))?;

        // SAFETY: SetWindowPos with a valid HWND is safe; a stale HWND is
        // reported as ERROR_INVALID_WINDOW_HANDLE.
        unsafe { SetWindowPos(hwnd, None, x, y, cx, cy, flags) }.map_err(|e| map_error(Some(handle), e))
    }

    fn monitors(&self) -> Result<Vec<WindowGeometry>, BackendError> {
        let mut monitors: Vec<WindowGeometry> = Vec::new();

        // SAFETY: EnumDisplayMonitors runs synchronously; the callback
        // receives a pointer to our Vec through LPARAM.
        let ok = unsafe {
            EnumDisplayMonitors(
                None,
                None,
                Some(collect_monitor),
                LPARAM(&mut monitors as *mut _ as isize),
            )
        };

        if !ok.as_bool() {
            return Err(BackendError::Os("EnumDisplayMonitors failed".to_string()));
        }
        Ok(monitors)
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is a pointer to the Vec<HWND> from enumerate_windows().
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
    handles.push(hwnd);
    BOOL(1) // TRUE: continue enumerating
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    // SAFETY: lparam is a pointer to the Vec from monitors().
    let monitors = unsafe { &mut *(lparam.0 as *mut Vec<WindowGeometry>) };

    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };

    // SAFETY: cbSize is set as the API requires.
    if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        monitors.push(from_rect(&info.rcMonitor));
    }
    BOOL(1)
}

fn read_record(hwnd: HWND) -> Result<WindowRecord, BackendError> {
    let bounds = rect_of(hwnd)?;

    let mut pid = 0u32;
    // SAFETY: GetWindowThreadProcessId, IsWindowVisible and
    // GetWindowLongPtrW only read window state.
    let (visible, ex_style) = unsafe {
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        (
            IsWindowVisible(hwnd).as_bool(),
            GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32,
        )
    };

    Ok(WindowRecord {
        handle: to_handle(hwnd),
        pid,
        title: title_of(hwnd),
        visible,
        tool: (ex_style & WS_EX_TOOLWINDOW.0) == WS_EX_TOOLWINDOW.0,
        bounds,
    })
}

fn title_of(hwnd: HWND) -> String {
    // SAFETY: GetWindowTextLengthW and GetWindowTextW read window text
    // without modifying state.
    unsafe {
        let length = GetWindowTextLengthW(hwnd);
        if length <= 0 {
            return String::new();
        }

        // +1 for the null terminator that Windows requires
        let mut buffer = vec![0u16; (length + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut buffer).max(0);
        String::from_utf16_lossy(&buffer[..copied as usize])
    }
}

fn rect_of(hwnd: HWND) -> Result<WindowGeometry, BackendError> {
    let mut rect = RECT::default();
    // SAFETY: GetWindowRect writes into our RECT.
    unsafe { GetWindowRect(hwnd, &mut rect) }.map_err(|e| map_error(Some(to_handle(hwnd)), e))?;
    Ok(from_rect(&rect))
}

fn from_rect(rect: &RECT) -> WindowGeometry {
    WindowGeometry::new(
        rect.left,
        rect.top,
        (rect.right - rect.left).max(0) as u32,
        (rect.bottom - rect.top).max(0) as u32,
    )
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle::from_raw(hwnd.0 as usize as u64)
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.as_raw() as usize as *mut _)
}

fn map_error(handle: Option<WindowHandle>, err: windows::core::Error) -> BackendError {
    let code = err.code();

    if code == HRESULT::from_win32(ERROR_INVALID_WINDOW_HANDLE.0) {
        if let Some(handle) = handle {
            return BackendError::WindowGone(handle);
        }
    }
    if code == HRESULT::from_win32(ERROR_ACCESS_DENIED.0) {
        return BackendError::AccessDenied(err.message());
    }
    if code == HRESULT::from_win32(ERROR_BUSY.0) || code == HRESULT::from_win32(ERROR_TIMEOUT.0) {
        return BackendError::Transient(err.message());
    }

    BackendError::Os(format!("{} ({:?})", err.message(), code))
}
