//! Error types for broadcast administration primitives.

use thiserror::Error;

/// Command argument failed validation before any request was issued.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric argument was not a number.
    #[error("{field} must be a valid number (got '{value}')")]
    NotANumber {
        /// Argument name.
        field: &'static str,
        /// Offending input.
        value: String,
    },
    /// Numeric argument fell outside its accepted range.
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// Argument name.
        field: &'static str,
        /// Offending value rendered for display.
        value: String,
        /// Inclusive lower bound.
        min: String,
        /// Inclusive upper bound.
        max: String,
    },
    /// Flags that cannot be combined were both supplied.
    #[error("cannot use {first} and {second} together")]
    ConflictingFlags {
        /// First flag.
        first: &'static str,
        /// Second flag.
        second: &'static str,
    },
    /// Source URL template was rejected.
    #[error("invalid URL: {reason}")]
    InvalidUrl {
        /// Human-readable rejection reason.
        reason: String,
    },
}

/// Time shift string could not be interpreted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// Input was empty.
    #[error("time difference must not be empty")]
    Empty,
    /// Input was not a recognised duration.
    #[error(
        "time difference must be a valid duration string (e.g. '1h', '30m', '-15s'), got '{value}'"
    )]
    Unparseable {
        /// Offending input.
        value: String,
    },
    /// Duration does not fit in signed milliseconds.
    #[error("time difference '{value}' is too large")]
    Overflow {
        /// Offending input.
        value: String,
    },
}

/// PGN text could not be read.
#[derive(Debug, Error)]
pub enum PgnError {
    /// The underlying reader failed.
    #[error("failed to read PGN")]
    Read {
        /// Reader error.
        #[source]
        source: std::io::Error,
    },
}

/// A single round edit did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Server answered with a non-success status.
    #[error("{status} {reason}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Status text or response detail.
        reason: String,
    },
    /// Request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Transport failure description.
        message: String,
    },
}
