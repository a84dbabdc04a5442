//! Error types for Refract
//!
//! Every failure that can leave the engine is one [`Error`]. Failures are
//! enriched as they cross entity boundaries by rewriting the message with
//! [`Error::annotate`]; the variant never changes on the way out.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::fmt;
use thiserror::Error;

/// Result type alias for Refract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Refract
///
/// # Categories
///
/// | Variant | Raised when |
/// |---------|-------------|
/// | `Lookup` | Unknown entity id (at resolution) or entity type (at build) |
/// | `Type` | A hash/collection entity received the wrong shape |
/// | `Resolution` | A function, path or value reducer failed |
/// | `RecoveryExhausted` | An `error` hook failed while handling a failure |
/// | `Validation` | A schema collaborator rejected a value |
/// | `InvalidSpec` | A reducer or entity definition is malformed |
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Unknown entity id or entity type
    #[error("{message}")]
    Lookup {
        /// Rendered message
        message: String,
    },

    /// Structural validation failure (expected object/array, got other)
    #[error("{message}")]
    Type {
        /// Rendered message
        message: String,
    },

    /// A reducer itself failed
    #[error("{message}")]
    Resolution {
        /// Rendered message
        message: String,
    },

    /// An `error` hook ran and failed itself
    #[error("{message}")]
    RecoveryExhausted {
        /// Rendered message of the hook failure
        message: String,
        /// The failure the hook was trying to recover from
        original: Box<Error>,
    },

    /// A schema collaborator reported the value as invalid
    #[error("{message}")]
    Validation {
        /// Rendered message
        message: String,
        /// Diagnostics reported by the collaborator
        diagnostics: Vec<String>,
    },

    /// Malformed reducer or entity definition
    #[error("{message}")]
    InvalidSpec {
        /// Rendered message
        message: String,
    },
}

/// Fieldless discriminant of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Lookup`]
    Lookup,
    /// See [`Error::Type`]
    Type,
    /// See [`Error::Resolution`]
    Resolution,
    /// See [`Error::RecoveryExhausted`]
    RecoveryExhausted,
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::InvalidSpec`]
    InvalidSpec,
}

impl ErrorKind {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lookup => "lookup",
            ErrorKind::Type => "type",
            ErrorKind::Resolution => "resolution",
            ErrorKind::RecoveryExhausted => "recovery_exhausted",
            ErrorKind::Validation => "validation",
            ErrorKind::InvalidSpec => "invalid_spec",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create a lookup error
    pub fn lookup(message: impl Into<String>) -> Self {
        Error::Lookup {
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type {
            message: message.into(),
        }
    }

    /// Create a resolution error
    ///
    /// This is the error user-authored function reducers should return.
    pub fn resolution(message: impl Into<String>) -> Self {
        Error::Resolution {
            message: message.into(),
        }
    }

    /// Create a recovery-exhausted error wrapping the original failure
    pub fn recovery_exhausted(message: impl Into<String>, original: Error) -> Self {
        Error::RecoveryExhausted {
            message: message.into(),
            original: Box::new(original),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Error::Validation {
            message: message.into(),
            diagnostics,
        }
    }

    /// Create an invalid-spec error
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Error::InvalidSpec {
            message: message.into(),
        }
    }

    /// The variant as a fieldless kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lookup { .. } => ErrorKind::Lookup,
            Error::Type { .. } => ErrorKind::Type,
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::RecoveryExhausted { .. } => ErrorKind::RecoveryExhausted,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::InvalidSpec { .. } => ErrorKind::InvalidSpec,
        }
    }

    /// The rendered message
    pub fn message(&self) -> &str {
        match self {
            Error::Lookup { message }
            | Error::Type { message }
            | Error::Resolution { message }
            | Error::RecoveryExhausted { message, .. }
            | Error::Validation { message, .. }
            | Error::InvalidSpec { message } => message,
        }
    }

    fn message_mut(&mut self) -> &mut String {
        match self {
            Error::Lookup { message }
            | Error::Type { message }
            | Error::Resolution { message }
            | Error::RecoveryExhausted { message, .. }
            | Error::Validation { message, .. }
            | Error::InvalidSpec { message } => message,
        }
    }

    /// Prepend `prefix` to the message, keeping the variant
    ///
    /// `Error::resolution("boom").annotate("hash:foo.mapKeys")` renders as
    /// `"hash:foo.mapKeys boom"`.
    pub fn annotate(mut self, prefix: impl fmt::Display) -> Self {
        let message = self.message_mut();
        *message = format!("{} {}", prefix, message);
        self
    }

    /// The failure an `error` hook was handling, if this is a recovery failure
    pub fn original(&self) -> Option<&Error> {
        match self {
            Error::RecoveryExhausted { original, .. } => Some(original),
            _ => None,
        }
    }
}
