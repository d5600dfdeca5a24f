//! Value types shared by the snapshot, enumerator, locator and controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating-system process id
pub type Pid = u32;

/// Opaque OS window identity
///
/// Only valid for the enumeration+action cycle that produced it. Never store
/// one across façade calls: the OS may destroy the window, and on some
/// platforms reuse the value, at any moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Bounding rectangle in monitor (screen) space
///
/// `x`/`y` may be negative on layouts with displays left of or above the
/// primary monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels, used to rank candidate primary windows.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Whether the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &WindowGeometry) -> bool {
        i64::from(self.x) < other.right()
            && i64::from(other.x) < self.right()
            && i64::from(self.y) < other.bottom()
            && i64::from(other.y) < self.bottom()
    }
}

/// Show state of a top-level window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowState {
    Normal,
    Maximized,
    Minimized,
}

/// One top-level window as seen by a single snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub pid: Pid,
    /// May be empty
    pub title: String,
    pub visible: bool,
    /// Tool window, dock, panel, tooltip and similar non-application surfaces
    pub tool: bool,
    pub bounds: WindowGeometry,
}

/// A process owning at least one top-level window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: Pid,
    pub image_name: String,
    /// Title of the process's primary window
    pub window_title: String,
    pub window_count: usize,
}

/// A requested change to a window's bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsChange {
    /// Change the extent only; the current top-left origin is kept.
    Resize { width: u32, height: u32 },
    /// Change origin and extent in a single request.
    MoveResize(WindowGeometry),
}

impl BoundsChange {
    pub fn extent(&self) -> (u32, u32) {
        match self {
            BoundsChange::Resize { width, height } => (*width, *height),
            BoundsChange::MoveResize(rect) => (rect.width, rect.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_does_not_overflow() {
        let rect = WindowGeometry::new(0, 0, u32::MAX, u32::MAX);
        assert_eq!(rect.area(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn test_intersects_negative_offsets() {
        let left_monitor = WindowGeometry::new(-1920, 0, 1920, 1080);
        let window = WindowGeometry::new(-400, 200, 800, 600);
        assert!(window.intersects(&left_monitor));

        let far_away = WindowGeometry::new(-5000, -5000, 100, 100);
        assert!(!far_away.intersects(&left_monitor));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = WindowGeometry::new(0, 0, 100, 100);
        let b = WindowGeometry::new(100, 0, 100, 100);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_handle_display_is_hex() {
        assert_eq!(WindowHandle::from_raw(0x3a00007).to_string(), "0x3A00007");
    }

    #[test]
    fn test_process_info_serializes_camel_case() {
        let info = ProcessInfo {
            pid: 42,
            image_name: "firefox".to_string(),
            window_title: "Mozilla Firefox".to_string(),
            window_count: 2,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["imageName"], "firefox");
        assert_eq!(value["windowTitle"], "Mozilla Firefox");
        assert_eq!(value["windowCount"], 2);
    }
}
