//! Error types for monitor detection and mode switching.

use thiserror::Error;

/// Result type alias for monitors operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting monitors or applying modes.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS could not list the attached displays.
    #[error("display enumeration unavailable: {0}")]
    EnumerationUnavailable(String),

    /// The requested mode is no longer reported for its monitor.
    ///
    /// Usually means the display was reconfigured since detection ran.
    #[error("mode is no longer available")]
    ModeNotFound,

    /// The OS refused to switch to the requested mode.
    #[error("mode switch rejected: {0}")]
    Rejected(String),

    /// The mode belongs to a different monitor than the one given.
    #[error("mode does not belong to this monitor")]
    ForeignMode,

    /// Platform-specific error.
    #[error("platform error: {0}")]
    Platform(String),

    /// No display backend is available for this build.
    #[error("not supported: {0}")]
    NotSupported(String),
}
