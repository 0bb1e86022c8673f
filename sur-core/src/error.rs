//! Error types for the tuner core.

use thiserror::Error;

/// Result type for tuner operations.
pub type TunerResult<T> = Result<T, TunerError>;

/// Errors that can occur while capturing audio or mapping notes.
///
/// "No pitch detected" is deliberately absent: silence and weak correlation
/// are normal per-poll outcomes and are reported as `None`, never as an
/// error.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The environment refused microphone access.
    #[error("microphone access denied: {reason}")]
    PermissionDenied {
        /// Backend description of the refusal.
        reason: String,
    },

    /// No compatible audio input device exists or the device failed.
    #[error("no usable audio input device: {reason}")]
    DeviceUnavailable {
        /// What went wrong while opening the device.
        reason: String,
    },

    /// An operation was called in the wrong session state.
    #[error("invalid engine state: {message}")]
    InvalidState {
        /// Which state the operation required.
        message: String,
    },

    /// A caller-supplied value was out of range or malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the value.
        message: String,
    },
}
