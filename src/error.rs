//! Error types for reading, filtering and following files.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for `see` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, stating or reading the watched file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Both a first-N and a last-N selection were requested.
    #[error("Use either --first or --last, not both")]
    ConflictingSelection,

    /// File path errors.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// The path exists but names a directory.
    #[error("Expected a file, but got a directory: {path}")]
    NotAFile { path: PathBuf },

    /// The file does not exist or cannot be accessed.
    #[error("Cannot access file: {path}")]
    FileNotFound { path: String },

    /// The filter pattern failed to compile.
    #[error("Invalid regex pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Writing a rendered line to the output failed.
    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    /// Stream has been closed or dropped.
    #[error("Stream closed")]
    StreamClosed,
}

/// A convenient Result type for `see` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();

        match error {
            Error::Io(_) => {}
            _ => panic!("Expected Error::Io variant"),
        }

        assert!(error.to_string().contains("I/O error"));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_watcher_error_conversion() {
        let notify_error = notify::Error::generic("Test watcher error");
        let error: Error = notify_error.into();

        match error {
            Error::Watcher(_) => {}
            _ => panic!("Expected Error::Watcher variant"),
        }

        assert!(error.to_string().contains("File watcher error"));
        assert!(error.to_string().contains("Test watcher error"));
    }

    #[test]
    fn test_invalid_pattern_keeps_pattern_text() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let error = Error::InvalidPattern {
            pattern: "(unclosed".to_string(),
            source,
        };

        let message = error.to_string();
        assert!(message.starts_with("Invalid regex pattern \"(unclosed\""));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_configuration_error_messages() {
        assert_eq!(
            Error::ConflictingSelection.to_string(),
            "Use either --first or --last, not both"
        );
        assert_eq!(
            Error::NotAFile {
                path: PathBuf::from("/var/log")
            }
            .to_string(),
            "Expected a file, but got a directory: /var/log"
        );
        assert_eq!(
            Error::FileNotFound {
                path: "/path/to/missing/file.log".to_string(),
            }
            .to_string(),
            "Cannot access file: /path/to/missing/file.log"
        );
        assert_eq!(
            Error::InvalidPath {
                message: "path has no file name".to_string(),
            }
            .to_string(),
            "Invalid file path: path has no file name"
        );
    }

    #[test]
    fn test_output_error_chain() {
        let error = Error::Output(IoError::new(ErrorKind::BrokenPipe, "pipe closed"));

        assert!(error.to_string().contains("pipe closed"));
        match error.source() {
            Some(inner) => assert_eq!(inner.to_string(), "pipe closed"),
            None => panic!("Expected the io::Error as source"),
        }
    }

    #[test]
    fn test_stream_closed_error() {
        let error = Error::StreamClosed;
        assert_eq!(error.to_string(), "Stream closed");
        assert_eq!(format!("{:?}", error), "StreamClosed");
    }

    #[test]
    fn test_error_send_sync_traits() {
        // The follow loop runs on spawned tasks, so errors must cross threads.
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
