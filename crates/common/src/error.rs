//! Common error types for the stream watchdog components.

use std::fmt;

/// A specialized Result type for watchdog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for watchdog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Check log error: {0}")]
    CheckLog(String),

    #[error("Remediation error: {0}")]
    Remediation(String),
}

impl Error {
    /// Create a new probe error.
    pub fn probe(msg: impl fmt::Display) -> Self {
        Error::Probe(msg.to_string())
    }

    /// Create a new notification delivery error.
    pub fn notify(msg: impl fmt::Display) -> Self {
        Error::Notify(msg.to_string())
    }

    /// Create a new check log persistence error.
    pub fn check_log(msg: impl fmt::Display) -> Self {
        Error::CheckLog(msg.to_string())
    }

    /// Create a new remediation error.
    pub fn remediation(msg: impl fmt::Display) -> Self {
        Error::Remediation(msg.to_string())
    }
}
