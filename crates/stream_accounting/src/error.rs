//! Construction-time error kinds.

use thiserror::Error;

/// Raised when stream parameters are built or validated. The calculator
/// itself never returns an error.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum StreamError {
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),
}

pub type Result<T> = std::result::Result<T, StreamError>;
