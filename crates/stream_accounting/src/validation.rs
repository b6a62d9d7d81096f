//! Construction-time checks for [`StreamParameters`].
//!
//! Validation is kept apart from the calculator: parameters are checked once
//! when they are built or decoded, and every later query is a total function.

use crate::error::{Result, StreamError};
use crate::types::StreamParameters;

impl StreamParameters {
    /// Build a fresh linear stream (nothing withdrawn, not paused, not
    /// canceled, no automatic withdrawals) and validate it.
    pub fn linear(
        total_amount: u64,
        start_time: i64,
        end_time: i64,
        cliff_time: Option<i64>,
    ) -> Result<Self> {
        let params = StreamParameters {
            total_amount,
            start_time,
            end_time,
            cliff_time,
            last_withdrawal_time: start_time,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Return the first violated invariant, if any.
    pub fn validate(&self) -> Result<()> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Collect every violated invariant, in check order.
    pub fn violations(&self) -> Vec<StreamError> {
        let mut errors = Vec::new();

        // Check: the start time is strictly less than the end time.
        if self.end_time <= self.start_time {
            errors.push(StreamError::InvalidTimeRange(
                "end time must be after start time",
            ));
        }

        // Check: the cliff, when set, lies within [start, end].
        if let Some(cliff) = self.cliff_time {
            if cliff < self.start_time || cliff > self.end_time {
                errors.push(StreamError::InvalidTimeRange(
                    "cliff time must be between start and end time",
                ));
            }
        }

        if self.total_paused_time < 0 {
            errors.push(StreamError::InvalidTimeRange(
                "total paused time must not be negative",
            ));
        }

        // Check: the recipient never withdrew more than was deposited.
        if self.withdrawn_amount > self.total_amount {
            errors.push(StreamError::InvalidAmount(
                "withdrawn amount exceeds total amount",
            ));
        }

        errors
    }
}

/// Checks applied before a new stream is submitted: the stream must carry a
/// positive amount and must not already be over.
pub fn validate_new_stream(params: &StreamParameters, now: i64) -> Result<()> {
    if params.total_amount == 0 {
        return Err(StreamError::InvalidAmount("amount must be greater than 0"));
    }

    params.validate()?;

    if params.end_time <= now {
        return Err(StreamError::InvalidTimeRange(
            "end time must be in the future",
        ));
    }

    Ok(())
}
