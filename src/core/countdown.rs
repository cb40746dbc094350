//! Countdown bookkeeping for the timed confirmation workflow.

/// Render remaining seconds as `HH:MM:SS` with two-digit fields.
///
/// Negative values clamp to `00:00:00`; the display never goes below zero
/// even though the tick that crosses zero still fires.
pub fn format_clock(seconds: i64) -> String {
    let secs = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_clock(3661), "01:01:01");
        assert_eq!(format_clock(45), "00:00:45");
        assert_eq!(format_clock(3600), "01:00:00");
    }

    #[test]
    fn zero_and_negative_clamp_to_all_zeros() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(-1), "00:00:00");
        assert_eq!(format_clock(-100), "00:00:00");
    }
}
