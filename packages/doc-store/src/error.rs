//! Error types for the document store.
//!
//! Only storage failures surface here. Malformed document *contents* are the
//! codec layer's concern and never become a `StoreError`.

use crate::key::KeyError;

/// Errors raised by the store and its persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying file or device I/O failed.
    #[error("i/o error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document set could not be understood.
    #[error("corrupt document set: {message}")]
    Corrupt { message: String },

    /// The document set could not be serialized for persistence.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A key failed validation.
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn io_error_display_includes_context() {
        let e = StoreError::io(
            "renaming state file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let display = format!("{}", e);
        assert!(display.contains("renaming state file"));
        assert!(display.contains("denied"));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn corrupt_display() {
        let e = StoreError::Corrupt {
            message: "expected object".to_string(),
        };
        assert_eq!(format!("{}", e), "corrupt document set: expected object");
    }

    #[test]
    fn key_error_converts() {
        let e: StoreError = KeyError::Empty.into();
        assert!(matches!(e, StoreError::InvalidKey(KeyError::Empty)));
        assert_eq!(format!("{}", e), "invalid key: empty");
    }

    #[test]
    fn corrupt_has_no_source() {
        let e = StoreError::Corrupt {
            message: "x".to_string(),
        };
        assert!(StdError::source(&e).is_none());
    }
}
