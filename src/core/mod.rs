//! Core service logic, independent of the window system and transport

pub mod desktop;
pub mod enumerator;
pub mod geometry;
pub mod locator;
pub mod retry;
pub mod snapshot;
pub mod types;
