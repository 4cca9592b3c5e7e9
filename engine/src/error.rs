//! Error types for the transfer engine.
//!
//! Every error is fatal to the run: the first one encountered unwinds the
//! traversal and is handed back to the caller. Non-fatal conditions are
//! reported as warnings through the progress callback instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse category of an [`EngineError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Resource,
    Circular,
    UserStop,
    Operation,
    Unimplemented,
}

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or contradictory job configuration, detected before traversal
    #[error("{0}")]
    Usage(String),

    /// A working buffer could not be allocated
    #[error("Out Of Memory! ({0})")]
    Resource(String),

    /// A source directory is the destination root (or contains it)
    #[error("Circular Directory Copy Attempted! ({})", path.display())]
    Circular { path: PathBuf },

    /// The operator asked to stop
    #[error("Terminated by the user!")]
    UserStop,

    /// Filesystem failure or verification mismatch on a specific path
    #[error("{message} {}{}", path.display(), os_suffix(source.as_ref()))]
    Operation {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The selected mode exists on the command line but has no implementation
    #[error("{0}")]
    Unimplemented(String),
}

fn os_suffix(source: Option<&io::Error>) -> String {
    match source.and_then(|e| e.raw_os_error()) {
        Some(code) => format!(" (errno={})", code),
        None => match source {
            Some(e) => format!(" ({})", e),
            None => String::new(),
        },
    }
}

impl EngineError {
    /// Build an `Operation` error carrying the OS error that caused it.
    pub fn io(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        EngineError::Operation {
            path: path.to_path_buf(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build an `Operation` error with no underlying OS error
    /// (verification mismatch, oversized name, short write).
    pub fn operation(message: impl Into<String>, path: &Path) -> Self {
        EngineError::Operation {
            path: path.to_path_buf(),
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Resource(_) => ErrorKind::Resource,
            Self::Circular { .. } => ErrorKind::Circular,
            Self::UserStop => ErrorKind::UserStop,
            Self::Operation { .. } => ErrorKind::Operation,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
        }
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Operation {
                source: Some(source),
                ..
            } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Process exit status for this error.
    ///
    /// The numbers are stable so scripts can tell a deliberate stop from a
    /// usage mistake or a failed operation.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Operation | ErrorKind::Unimplemented => 1,
            ErrorKind::Usage => 2,
            ErrorKind::Resource => 3,
            ErrorKind::Circular => 4,
            ErrorKind::UserStop => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_carries_path_and_errno() {
        let err = EngineError::io(
            "Could Not Create",
            Path::new("/tmp/x"),
            io::Error::from_raw_os_error(13),
        );
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(err.raw_os_error(), Some(13));
        assert_eq!(err.to_string(), "Could Not Create /tmp/x (errno=13)");
    }

    #[test]
    fn test_operation_error_without_source() {
        let err = EngineError::operation("Destination Check Failed!", Path::new("a/b"));
        assert_eq!(err.raw_os_error(), None);
        assert_eq!(err.to_string(), "Destination Check Failed! a/b");
    }

    #[test]
    fn test_exit_codes_distinguish_kinds() {
        assert_eq!(EngineError::Usage("bad".into()).exit_code(), 2);
        assert_eq!(EngineError::Resource("buffer".into()).exit_code(), 3);
        assert_eq!(
            EngineError::Circular {
                path: PathBuf::from("d")
            }
            .exit_code(),
            4
        );
        assert_eq!(EngineError::UserStop.exit_code(), 5);
        assert_eq!(EngineError::Unimplemented("sync".into()).exit_code(), 1);
    }
}
