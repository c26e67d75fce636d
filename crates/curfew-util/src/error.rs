//! Error types for curfew

use thiserror::Error;

use crate::ListKind;

/// Core error type for curfew operations
///
/// Expected outcomes of the unblock flow (rate limiting, a failed
/// challenge, a wrong password) are not errors; they are reported through
/// the outcome types in `curfew-core`.
#[derive(Debug, Error)]
pub enum CurfewError {
    /// The process lacks the privilege to touch a system resource.
    /// Callers typically offer to relaunch elevated.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A system resource is missing or temporarily unusable.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: ListKind,
        name: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CurfewError {
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    pub fn invalid_name(
        kind: ListKind,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify an I/O failure on a system resource.
    ///
    /// Permission problems map to `PermissionDenied`, everything else
    /// (missing file, sharing violation, full disk) to `ResourceUnavailable`.
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("{}: {}", context, err))
            }
            _ => Self::ResourceUnavailable(format!("{}: {}", context, err)),
        }
    }

    /// Whether relaunching with elevated privileges could resolve this error
    pub fn needs_elevation(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, CurfewError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_are_classified() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = CurfewError::from_io("writing /etc/hosts", &denied);
        assert!(err.needs_elevation());
        assert!(err.to_string().contains("/etc/hosts"));

        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = CurfewError::from_io("reading /etc/hosts", &missing);
        assert!(matches!(err, CurfewError::ResourceUnavailable(_)));
        assert!(!err.needs_elevation());
    }

    #[test]
    fn invalid_name_message() {
        let err = CurfewError::invalid_name(ListKind::Website, "bad name", "contains whitespace");
        assert_eq!(
            err.to_string(),
            "Invalid website name \"bad name\": contains whitespace"
        );
    }
}
