//! # Types
//!
//! Shared data structures used across all modules of the stream accounting
//! library.
//!
//! ## Design decisions
//!
//! ### Parameters / Metrics split
//!
//! A stream is described to the calculator by two distinct shapes:
//!
//! - [`StreamParameters`]: the decoded account state. Supplied by the caller
//!   on every query; never mutated or cached by this crate.
//! - [`StreamMetrics`]: derived on every call from `(parameters, now)`.
//!   Never persisted.
//!
//! ### Status classification
//!
//! [`StreamStatus`] is a classification, not a stored state machine. It is
//! recomputed for every query with a fixed priority:
//!
//! ```text
//! Canceled ─► Paused ─► Scheduled ─► Completed ─► Active
//! (first match wins)
//! ```
//!
//! `Canceled` is terminal: once the flag is set no other status is reported.

use serde::{Deserialize, Serialize};

/// Classification of a stream at a given instant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// Start time not yet reached.
    Scheduled,
    /// Streaming.
    Active,
    /// Paused by the sender; accrual is frozen at the pause instant.
    Paused,
    /// End time reached.
    Completed,
    /// Terminated; no further accrual.
    Canceled,
}

impl StreamStatus {
    /// Parse the snake_case identifier used in query strings and storage.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scheduled" => Some(Self::Scheduled),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// Display priority used when listing streams: live streams first.
    pub fn sort_priority(&self) -> u8 {
        match self {
            Self::Active => 1,
            Self::Scheduled => 2,
            Self::Paused => 3,
            Self::Completed => 4,
            Self::Canceled => 5,
        }
    }
}

/// Immutable stream parameters, as decoded from the stream account.
///
/// Amounts are in the token's smallest unit; timestamps are Unix seconds.
/// Use [`StreamParameters::validate`] (see `validation.rs`) before trusting
/// values from an untrusted source.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreamParameters {
    /// Total amount deposited into the stream.
    pub total_amount: u64,
    pub start_time: i64,
    pub end_time: i64,
    /// Cliff timestamp; `None` means the cliff is the start time.
    pub cliff_time: Option<i64>,
    /// Amount already withdrawn by the recipient.
    pub withdrawn_amount: u64,
    pub paused: bool,
    /// Instant the current pause began.
    pub paused_at: Option<i64>,
    /// Seconds spent paused by previous, already resumed, pauses.
    pub total_paused_time: i64,
    pub canceled: bool,
    pub automatic_withdrawal: bool,
    /// Cadence of automatic withdrawals, in seconds.
    pub withdrawal_frequency: u64,
    pub last_withdrawal_time: i64,
}

impl StreamParameters {
    /// Cliff timestamp with the start-time default applied.
    pub fn effective_cliff(&self) -> i64 {
        self.cliff_time.unwrap_or(self.start_time)
    }

    /// Nominal duration, `end - start`.
    pub fn total_duration(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Nominal duration minus the time already spent paused.
    pub fn effective_duration(&self) -> i64 {
        self.total_duration().saturating_sub(self.total_paused_time)
    }
}

/// Values derived from [`StreamParameters`] at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamMetrics {
    pub streamed_amount: u64,
    pub withdrawable_amount: u64,
    pub remaining_amount: u64,
    pub withdrawn_amount: u64,
    /// `100 * streamed / total`, in `[0, 100]`.
    pub progress_percentage: f64,
    /// `100 * withdrawn / total`, in `[0, 100]`.
    pub withdrawn_percentage: f64,
    /// Effective elapsed streaming seconds (pauses excluded).
    pub time_elapsed: i64,
    /// Effective streaming seconds left.
    pub time_remaining: i64,
    pub total_duration: i64,
    /// Tokens released per second, truncated.
    pub withdrawal_rate: u64,
    pub status: StreamStatus,
    pub next_withdrawal_time: Option<i64>,
}

/// Who may cancel or transfer a stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreamPermissions {
    pub cancelable_by_sender: bool,
    pub cancelable_by_recipient: bool,
    pub transferable_by_sender: bool,
    pub transferable_by_recipient: bool,
}

/// A stream account together with its identity and metadata.
///
/// Addresses are base58 strings; the library never interprets them beyond
/// equality.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Stream account address.
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub mint: String,
    pub name: String,
    pub created_at: i64,
    pub permissions: StreamPermissions,
    pub params: StreamParameters,
}

/// Withdrawal cadences offered when building a vesting schedule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalFrequency {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl WithdrawalFrequency {
    pub fn seconds(&self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
            // 30 days.
            Self::Month => 2_592_000,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "second" => Some(Self::Second),
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Period breakdown of a linear vesting stream.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub cliff_duration: i64,
    pub vesting_duration: i64,
    /// Lump sum released at the cliff. Always zero for linear vesting.
    pub cliff_amount: u64,
    pub periodic_amount: u64,
    pub frequency: WithdrawalFrequency,
    pub periods: u64,
}
