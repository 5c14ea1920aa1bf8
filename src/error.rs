//! Error types for the extraction pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort (or prevent) an extraction run.
///
/// Lines that fail to parse are not errors; they are dropped inside the
/// worker and only show up in the aggregate counters.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A supplied input path does not resolve to a readable file
    #[error("Input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// Reading an accepted input failed mid-run
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating or writing the output artifact failed
    #[error("Failed to write output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be started
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Configuration rejected before the run started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    /// Whether the error happened before any input was processed
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InputNotFound { .. } | Self::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_path() {
        let err = ExtractError::InputNotFound {
            path: PathBuf::from("missing.txt"),
        };
        assert_eq!(err.to_string(), "Input not found: missing.txt");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = ExtractError::io(
            "dump.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("Failed to read dump.txt"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_config_error());
    }
}
