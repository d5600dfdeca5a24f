//! Process enumeration over a snapshot
//!
//! Both listings are pure views over one [`Snapshot`]; the filtered view
//! applies [`ApplicationFilter`], the debug view only uses it to rank titles.

use super::locator::select_primary;
use super::snapshot::Snapshot;
use super::types::{ProcessInfo, WindowRecord};

/// Heuristic separating application windows from background surfaces
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Exact window titles treated as empty (IME helpers, shell host windows)
    ignored_titles: Vec<String>,
    /// Lowercased image names that are never applications
    excluded_images: Vec<String>,
}

impl ApplicationFilter {
    pub fn new(ignored_titles: &[String], excluded_images: &[String]) -> Self {
        Self {
            ignored_titles: ignored_titles.to_vec(),
            excluded_images: excluded_images.iter().map(|name| name.to_lowercase()).collect(),
        }
    }

    /// Whether `window` looks like a real application window: visible,
    /// not tool/system styled and carrying a meaningful title.
    pub fn is_application_window(&self, window: &WindowRecord) -> bool {
        window.visible && !window.tool && self.has_meaningful_title(window)
    }

    /// Title is non-blank and not one of the ignored titles
    pub fn has_meaningful_title(&self, window: &WindowRecord) -> bool {
        let title = window.title.trim();
        !title.is_empty() && !self.ignored_titles.iter().any(|ignored| ignored == title)
    }

    pub fn is_excluded_image(&self, image_name: &str) -> bool {
        let image_name = image_name.to_lowercase();
        self.excluded_images.iter().any(|excluded| *excluded == image_name)
    }
}

/// Processes that own at least one application window.
///
/// `window_count` is the number of visible, non-tool windows the process
/// owns; the title is taken from the process's primary window.
pub fn list_application_processes(snapshot: &Snapshot, filter: &ApplicationFilter) -> Vec<ProcessInfo> {
    let mut processes = Vec::new();

    for (pid, windows) in snapshot.windows_by_process() {
        let image_name = snapshot.image_name(pid).unwrap_or_default();
        if filter.is_excluded_image(image_name) {
            continue;
        }
        if !windows.iter().any(|w| filter.is_application_window(w)) {
            continue;
        }

        let Some(primary) = select_primary(windows.iter().copied(), filter) else {
            continue;
        };

        processes.push(ProcessInfo {
            pid,
            image_name: image_name.to_string(),
            window_title: primary.title.clone(),
            window_count: windows.iter().filter(|w| w.visible && !w.tool).count(),
        });
    }

    tracing::info!("Found {} application processes", processes.len());
    processes
}

/// Every process owning at least one top-level window, visible or not.
///
/// Diagnostic view: `window_count` counts all top-level windows of the
/// process and no process is filtered out. `filter` only ranks titles, so
/// the reported title matches the window geometry calls act on.
pub fn list_all_processes_with_windows(snapshot: &Snapshot, filter: &ApplicationFilter) -> Vec<ProcessInfo> {
    let processes: Vec<ProcessInfo> = snapshot
        .windows_by_process()
        .into_iter()
        .filter_map(|(pid, windows)| {
            let primary = select_primary(windows.iter().copied(), filter)?;
            Some(ProcessInfo {
                pid,
                image_name: snapshot.image_name(pid).unwrap_or_default().to_string(),
                window_title: primary.title.clone(),
                window_count: windows.len(),
            })
        })
        .collect();

    tracing::debug!("Found {} processes with windows", processes.len());
    processes
}
