//! # Stream Accounting
//!
//! Pure accounting for linear token streams: given a stream's immutable
//! parameters and a query instant, derive how much has streamed, how much the
//! recipient can withdraw, what remains, and which state the stream is in.
//!
//! | Concern      | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Construction | [`StreamParameters::linear`], [`StreamParameters::validate`], [`validate_new_stream`] |
//! | Queries      | [`calculate_metrics`], [`status_of`], [`streamed_amount_of`], [`withdrawable_amount_of`] |
//! | Scheduling   | [`vesting_schedule`], [`next_withdrawal_time_of`]           |
//! | Collections  | [`portfolio`] (ordering, totals, wallet split)              |
//! | Display      | [`format_amount`], [`format_duration`], [`format_time_remaining`] |
//!
//! ## Architecture
//!
//! The crate owns no state and performs no I/O. Query functions are total:
//! they never fail and never panic, whatever the parameters. Malformed
//! parameters are rejected once, at construction, with a [`StreamError`].
//!
//! Amounts are `u64` in the token's smallest unit; products are taken in
//! `u128` and divisions truncate. Only the percentage outputs are floats.

mod clock;
mod error;
mod fees;
mod format;
mod math;
pub mod portfolio;
mod schedule;
mod types;
mod validation;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_pause;
#[cfg(test)]
mod test_portfolio;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, StreamError};
pub use fees::{withdrawal_fee, MAX_FEE_BPS};
pub use format::{format_amount, format_duration, format_time_remaining};
pub use math::{
    calculate_metrics, is_withdrawable, next_withdrawal_time_of, progress_percentage_of,
    remaining_amount_of, status_of, streamed_amount_of, withdrawable_amount_of,
};
pub use schedule::vesting_schedule;
pub use types::{
    StreamMetrics, StreamParameters, StreamPermissions, StreamRecord, StreamStatus,
    VestingSchedule, WithdrawalFrequency,
};
pub use validation::validate_new_stream;
