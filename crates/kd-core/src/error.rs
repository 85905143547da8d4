use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct KdError {
    pub code: String,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl KdError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(
        code: impl Into<String>,
        message: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    pub fn io(error: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::with_path(
            "IO",
            format!("{}: {}", path.as_ref().display(), error),
            path,
        )
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_joins_code_and_message() {
        let error = KdError::new("NOT_A_PROJECT", "no addon.xml");
        assert_eq!(error.to_string(), "NOT_A_PROJECT: no addon.xml");
        assert!(error.path.is_none());
    }

    #[test]
    fn io_error_keeps_path() {
        let error = KdError::io(std::io::Error::other("denied"), "/tmp/a.xml");
        assert_eq!(error.code, "IO");
        assert_eq!(error.path.as_deref(), Some(Path::new("/tmp/a.xml")));
        assert!(error.message.contains("denied"));
    }
}
