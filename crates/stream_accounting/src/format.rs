//! Human-readable rendering of amounts and durations.

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Renders a smallest-unit amount with `decimals` fractional digits,
/// trailing zeros removed. Works on the decimal string, so no precision is
/// lost for any `u64`.
pub fn format_amount(amount: u64, decimals: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Two-unit duration, e.g. `"2m 5s"`, `"3h 20m"`, `"4d 2h"`. A zero
/// trailing unit is dropped. Negative inputs render as `"0s"`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);

    if seconds < MINUTE {
        return format!("{seconds}s");
    }

    let (major, major_unit, minor, minor_unit) = if seconds < HOUR {
        (seconds / MINUTE, "m", seconds % MINUTE, "s")
    } else if seconds < DAY {
        (seconds / HOUR, "h", (seconds % HOUR) / MINUTE, "m")
    } else {
        (seconds / DAY, "d", (seconds % DAY) / HOUR, "h")
    };

    if minor > 0 {
        format!("{major}{major_unit} {minor}{minor_unit}")
    } else {
        format!("{major}{major_unit}")
    }
}

/// Time left until `end_time`, or `"Completed"`.
pub fn format_time_remaining(end_time: i64, now: i64) -> String {
    let remaining = end_time.saturating_sub(now).max(0);
    if remaining == 0 {
        return "Completed".to_string();
    }

    format_duration(remaining)
}
