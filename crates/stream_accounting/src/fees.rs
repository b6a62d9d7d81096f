//! Withdrawal fee calculation.

use crate::error::{Result, StreamError};

/// 100% expressed in basis points.
pub const MAX_FEE_BPS: u16 = 10_000;

/// Fee charged on a withdrawal of `amount`, at `fee_bps` basis points
/// (100 = 1%). Rounds down.
pub fn withdrawal_fee(amount: u64, fee_bps: u16) -> Result<u64> {
    if fee_bps > MAX_FEE_BPS {
        return Err(StreamError::InvalidAmount("fee exceeds 100%"));
    }

    Ok((amount as u128 * fee_bps as u128 / MAX_FEE_BPS as u128) as u64)
}
