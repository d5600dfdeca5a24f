//! Primary window selection
//!
//! A process may own many top-level windows; geometry operations only ever
//! target one of them. The choice is deterministic for a given snapshot:
//!
//! 1. visible before non-visible
//! 2. application style before tool/system style
//! 3. meaningful title before empty, blank or ignored title
//! 4. larger bounding-rectangle area first
//! 5. lowest handle value

use std::cmp::{Ordering, Reverse};

use super::enumerator::ApplicationFilter;
use super::snapshot::Snapshot;
use super::types::{Pid, WindowRecord};

/// Failure to resolve a pid to its primary window
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("process {0} does not exist")]
    ProcessNotFound(Pid),

    #[error("process {0} owns no top-level window")]
    WindowNotFound(Pid),
}

/// Compare two candidates; `Less` means `a` is the better primary window.
///
/// Titles are judged by the same predicate that filters the application
/// listing, so a title the filter ignores never wins rule 3.
pub fn primary_order(filter: &ApplicationFilter, a: &WindowRecord, b: &WindowRecord) -> Ordering {
    rank(filter, a).cmp(&rank(filter, b))
}

fn rank(filter: &ApplicationFilter, window: &WindowRecord) -> (bool, bool, bool, Reverse<u64>, u64) {
    (
        !window.visible,
        window.tool,
        !filter.has_meaningful_title(window),
        Reverse(window.bounds.area()),
        window.handle.as_raw(),
    )
}

/// Pick the primary window among `candidates`.
pub fn select_primary<'a, I>(candidates: I, filter: &ApplicationFilter) -> Option<&'a WindowRecord>
where
    I: IntoIterator<Item = &'a WindowRecord>,
{
    candidates.into_iter().min_by(|a, b| primary_order(filter, a, b))
}

/// Resolve `pid` to its primary window within `snapshot`.
///
/// A pid missing from the process table reports `ProcessNotFound` even when
/// stale windows for it are still listed.
pub fn resolve(snapshot: &Snapshot, pid: Pid, filter: &ApplicationFilter) -> Result<WindowRecord, ResolveError> {
    if !snapshot.process_exists(pid) {
        return Err(ResolveError::ProcessNotFound(pid));
    }

    let candidates = snapshot.windows_of(pid);
    let primary =
        select_primary(candidates.iter().copied(), filter).ok_or(ResolveError::WindowNotFound(pid))?;

    tracing::debug!(
        pid,
        handle = %primary.handle,
        candidates = candidates.len(),
        "Resolved primary window"
    );
    Ok(primary.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{WindowGeometry, WindowHandle};
    use crate::process::ProcessTable;

    fn window(handle: u64, pid: Pid) -> WindowRecord {
        WindowRecord {
            handle: WindowHandle::from_raw(handle),
            pid,
            title: "Window".to_string(),
            visible: true,
            tool: false,
            bounds: WindowGeometry::new(0, 0, 400, 300),
        }
    }

    fn no_ignored_titles() -> ApplicationFilter {
        ApplicationFilter::default()
    }

    fn snapshot(windows: Vec<WindowRecord>, pids: &[Pid]) -> Snapshot {
        let processes: ProcessTable = pids.iter().map(|&pid| (pid, format!("proc{pid}"))).collect();
        Snapshot::new(windows, processes)
    }

    #[test]
    fn test_titled_application_window_beats_untitled_tool_window() {
        let toolbar = WindowRecord {
            title: String::new(),
            tool: true,
            bounds: WindowGeometry::new(0, 0, 200, 40),
            ..window(1, 10)
        };
        let main = WindowRecord {
            title: "Main".to_string(),
            bounds: WindowGeometry::new(0, 0, 1200, 800),
            ..window(2, 10)
        };

        let snap = snapshot(vec![toolbar, main], &[10]);
        let primary = resolve(&snap, 10, &no_ignored_titles()).unwrap();
        assert_eq!(primary.title, "Main");
    }

    #[test]
    fn test_visibility_outranks_every_other_criterion() {
        let hidden_big = WindowRecord {
            visible: false,
            bounds: WindowGeometry::new(0, 0, 4000, 4000),
            ..window(1, 10)
        };
        let visible_tool_untitled = WindowRecord {
            tool: true,
            title: String::new(),
            ..window(2, 10)
        };

        assert_eq!(
            select_primary([&hidden_big, &visible_tool_untitled], &no_ignored_titles()).unwrap().handle,
            WindowHandle::from_raw(2)
        );
    }

    #[test]
    fn test_style_outranks_title() {
        let tool_titled = WindowRecord {
            tool: true,
            ..window(1, 10)
        };
        let app_untitled = WindowRecord {
            title: String::new(),
            ..window(2, 10)
        };

        assert_eq!(
            select_primary([&tool_titled, &app_untitled], &no_ignored_titles()).unwrap().handle,
            WindowHandle::from_raw(2)
        );
    }

    #[test]
    fn test_title_outranks_area() {
        let untitled_big = WindowRecord {
            title: String::new(),
            bounds: WindowGeometry::new(0, 0, 3000, 2000),
            ..window(1, 10)
        };
        let titled_small = WindowRecord {
            bounds: WindowGeometry::new(0, 0, 100, 100),
            ..window(2, 10)
        };

        assert_eq!(
            select_primary([&untitled_big, &titled_small], &no_ignored_titles()).unwrap().handle,
            WindowHandle::from_raw(2)
        );
    }

    #[test]
    fn test_larger_area_wins() {
        let small = window(1, 10);
        let large = WindowRecord {
            bounds: WindowGeometry::new(-1920, 0, 1920, 1080),
            ..window(2, 10)
        };

        assert_eq!(select_primary([&small, &large], &no_ignored_titles()).unwrap().handle, WindowHandle::from_raw(2));
    }

    #[test]
    fn test_lowest_handle_breaks_ties_regardless_of_order() {
        let a = window(0x500, 10);
        let b = window(0x300, 10);
        let c = window(0x400, 10);

        assert_eq!(select_primary([&a, &b, &c], &no_ignored_titles()).unwrap().handle, WindowHandle::from_raw(0x300));
        assert_eq!(select_primary([&c, &a, &b], &no_ignored_titles()).unwrap().handle, WindowHandle::from_raw(0x300));
    }

    #[test]
    fn test_missing_process_takes_precedence_over_missing_window() {
        let snap = snapshot(vec![], &[]);
        assert_eq!(resolve(&snap, 77, &no_ignored_titles()), Err(ResolveError::ProcessNotFound(77)));
    }

    #[test]
    fn test_stale_windows_of_exited_process_report_process_not_found() {
        let snap = snapshot(vec![window(1, 77)], &[]);
        assert_eq!(resolve(&snap, 77, &no_ignored_titles()), Err(ResolveError::ProcessNotFound(77)));
    }

    #[test]
    fn test_live_process_without_windows() {
        let snap = snapshot(vec![window(1, 10)], &[10, 11]);
        assert_eq!(resolve(&snap, 11, &no_ignored_titles()), Err(ResolveError::WindowNotFound(11)));
    }

    #[test]
    fn test_ignored_title_ranks_as_untitled() {
        let filter = ApplicationFilter::new(&["Program Manager".to_string()], &[]);
        let desktop_host = WindowRecord {
            title: "Program Manager".to_string(),
            bounds: WindowGeometry::new(0, 0, 1920, 1080),
            ..window(1, 500)
        };
        let explorer = WindowRecord {
            title: "Documents - File Explorer".to_string(),
            bounds: WindowGeometry::new(200, 100, 900, 600),
            ..window(2, 500)
        };

        let snap = snapshot(vec![desktop_host, explorer], &[500]);
        assert_eq!(resolve(&snap, 500, &filter).unwrap().title, "Documents - File Explorer");
    }

    #[test]
    fn test_blank_title_ranks_as_untitled() {
        let blank = WindowRecord {
            title: "   ".to_string(),
            bounds: WindowGeometry::new(0, 0, 1600, 900),
            ..window(1, 10)
        };
        let main = WindowRecord {
            title: "Main".to_string(),
            bounds: WindowGeometry::new(0, 0, 800, 600),
            ..window(2, 10)
        };

        assert_eq!(
            select_primary([&blank, &main], &no_ignored_titles()).unwrap().title,
            "Main"
        );
    }

    #[test]
    fn test_hidden_only_window_still_resolves() {
        let hidden = WindowRecord {
            visible: false,
            ..window(9, 10)
        };
        let snap = snapshot(vec![hidden], &[10]);
        assert_eq!(resolve(&snap, 10, &no_ignored_titles()).unwrap().handle, WindowHandle::from_raw(9));
    }
}
