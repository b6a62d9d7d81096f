//! Vesting schedule breakdown for a given withdrawal cadence.

use crate::types::{StreamParameters, VestingSchedule, WithdrawalFrequency};

/// Splits the post-cliff part of the stream into whole `frequency` periods.
///
/// Linear vesting has no lump sum at the cliff, so `cliff_amount` is zero.
/// When not even one full period fits, the whole amount is reported as a
/// single payout.
pub fn vesting_schedule(
    params: &StreamParameters,
    frequency: WithdrawalFrequency,
) -> VestingSchedule {
    let cliff_duration = params
        .cliff_time
        .map(|cliff| cliff.saturating_sub(params.start_time).max(0))
        .unwrap_or(0);
    let vesting_duration = params.total_duration().saturating_sub(cliff_duration).max(0);

    let periods = vesting_duration as u64 / frequency.seconds();
    let periodic_amount = if periods > 0 {
        params.total_amount / periods
    } else {
        params.total_amount
    };

    VestingSchedule {
        cliff_duration,
        vesting_duration,
        cliff_amount: 0,
        periodic_amount,
        frequency,
        periods,
    }
}
