//! Façade error taxonomy
//!
//! Every failure a caller can observe is one of five kinds. Backend and
//! resolution errors are folded into these at the façade boundary, together
//! with the pid or geometry that caused them.

use serde::Serialize;

use crate::backend::BackendError;
use crate::core::geometry::GeometryError;
use crate::core::locator::ResolveError;
use crate::core::types::Pid;

/// Stable error kind reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ProcessNotFound,
    WindowNotFound,
    InvalidGeometry,
    PermissionDenied,
    #[serde(rename = "OSError")]
    OsError,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Process {pid} not found")]
    ProcessNotFound { pid: Pid },

    #[error("Process {pid} has no top-level window")]
    WindowNotFound { pid: Pid },

    #[error("Invalid geometry {width}x{height}: minimum is {min_width}x{min_height}")]
    InvalidGeometry {
        width: i64,
        height: i64,
        min_width: u32,
        min_height: u32,
    },

    #[error("Permission denied for process {pid}: {reason}")]
    PermissionDenied { pid: Pid, reason: String },

    #[error("OS call failed during {operation}: {message}")]
    OsError { operation: String, message: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ProcessNotFound { .. } => ErrorKind::ProcessNotFound,
            ServiceError::WindowNotFound { .. } => ErrorKind::WindowNotFound,
            ServiceError::InvalidGeometry { .. } => ErrorKind::InvalidGeometry,
            ServiceError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ServiceError::OsError { .. } => ErrorKind::OsError,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::ProcessNotFound { .. } => "PROCESS_NOT_FOUND",
            ServiceError::WindowNotFound { .. } => "WINDOW_NOT_FOUND",
            ServiceError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            ServiceError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ServiceError::OsError { .. } => "OS_ERROR",
        }
    }

    /// Whether the caller can fix the failure by changing the request
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ServiceError::ProcessNotFound { .. }
                | ServiceError::WindowNotFound { .. }
                | ServiceError::InvalidGeometry { .. }
        )
    }

    /// The pid the failing request targeted, if any
    pub fn pid(&self) -> Option<Pid> {
        match self {
            ServiceError::ProcessNotFound { pid }
            | ServiceError::WindowNotFound { pid }
            | ServiceError::PermissionDenied { pid, .. } => Some(*pid),
            ServiceError::InvalidGeometry { .. } | ServiceError::OsError { .. } => None,
        }
    }

    pub fn os(operation: &str, message: impl Into<String>) -> Self {
        ServiceError::OsError {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Fold a backend failure observed while acting on `pid`'s window.
    pub fn from_backend(err: BackendError, pid: Pid, operation: &str) -> Self {
        match err {
            BackendError::WindowGone(_) => ServiceError::WindowNotFound { pid },
            BackendError::AccessDenied(reason) => ServiceError::PermissionDenied { pid, reason },
            BackendError::Transient(message) | BackendError::Os(message) => Self::os(operation, message),
        }
    }

    pub fn from_geometry(err: GeometryError, pid: Pid, operation: &str) -> Self {
        match err {
            GeometryError::InvalidGeometry {
                width,
                height,
                min_width,
                min_height,
            } => ServiceError::InvalidGeometry {
                width,
                height,
                min_width,
                min_height,
            },
            deadline @ GeometryError::DeadlineExceeded { .. } => Self::os(operation, deadline.to_string()),
            GeometryError::Backend(e) => Self::from_backend(e, pid, operation),
        }
    }
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::ProcessNotFound(pid) => ServiceError::ProcessNotFound { pid },
            ResolveError::WindowNotFound(pid) => ServiceError::WindowNotFound { pid },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WindowHandle;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            ServiceError::ProcessNotFound { pid: 1 },
            ServiceError::WindowNotFound { pid: 1 },
            ServiceError::InvalidGeometry {
                width: 0,
                height: 0,
                min_width: 16,
                min_height: 16,
            },
            ServiceError::PermissionDenied {
                pid: 1,
                reason: "elevated".to_string(),
            },
            ServiceError::os("enumerate", "boom"),
        ];

        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.error_code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_kind_serializes_with_stable_names() {
        assert_eq!(serde_json::to_value(ErrorKind::OsError).unwrap(), "OSError");
        assert_eq!(serde_json::to_value(ErrorKind::ProcessNotFound).unwrap(), "ProcessNotFound");
        assert_eq!(serde_json::to_value(ErrorKind::InvalidGeometry).unwrap(), "InvalidGeometry");
    }

    #[test]
    fn test_backend_errors_fold_into_taxonomy() {
        let gone = ServiceError::from_backend(BackendError::WindowGone(WindowHandle::from_raw(3)), 42, "set bounds");
        assert_eq!(gone, ServiceError::WindowNotFound { pid: 42 });

        let denied = ServiceError::from_backend(BackendError::AccessDenied("elevated".to_string()), 42, "set bounds");
        assert_eq!(denied.kind(), ErrorKind::PermissionDenied);
        assert_eq!(denied.pid(), Some(42));

        let transient = ServiceError::from_backend(BackendError::Transient("busy".to_string()), 42, "set bounds");
        assert_eq!(transient.kind(), ErrorKind::OsError);
        assert_eq!(transient.to_string(), "OS call failed during set bounds: busy");
    }

    #[test]
    fn test_passed_deadline_is_os_error() {
        let err = ServiceError::from_geometry(
            GeometryError::DeadlineExceeded { stage: "apply bounds" },
            42,
            "set window bounds",
        );
        assert_eq!(err.kind(), ErrorKind::OsError);
        assert_eq!(err.to_string(), "OS call failed during set window bounds: timed out before apply bounds");
    }

    #[test]
    fn test_resolve_errors_keep_pid() {
        let err: ServiceError = ResolveError::ProcessNotFound(9).into();
        assert_eq!(err.kind(), ErrorKind::ProcessNotFound);
        assert_eq!(err.pid(), Some(9));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_os_errors_are_not_user_errors() {
        assert!(!ServiceError::os("enumerate", "boom").is_user_error());
        assert!(
            !ServiceError::PermissionDenied {
                pid: 1,
                reason: String::new()
            }
            .is_user_error()
        );
    }
}
