//! Casement - Window geometry and process enumeration MCP server
//!
//! This library lists the processes that own application windows and reads
//! or sets the screen bounds of a process's primary window.
//!
//! ## Features
//!
//! - Filtered listing of application processes, plus an unfiltered debug listing
//! - Deterministic primary window selection per process
//! - Resize (origin kept) and atomic move+resize, restoring maximized or
//!   minimized windows first
//! - Fixed error taxonomy: `ProcessNotFound`, `WindowNotFound`,
//!   `InvalidGeometry`, `PermissionDenied`, `OSError`
//!
//! ## Supported Environments
//!
//! - X11 (native and XWayland, via EWMH)
//! - Windows (Win32, per-monitor DPI aware)
//! - In-memory desktop for headless use

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod process;
pub mod server;
pub mod service;
