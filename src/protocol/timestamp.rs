//! `m:ss` formatting for commentary timestamps.

/// Format a play-clock offset in seconds as `m:ss`.
///
/// Minutes and seconds are both floor-truncated, never rounded, and seconds
/// are zero-padded to two digits.  Minutes are not capped, so a 90-minute
/// match renders as `90:00`.
///
/// ```
/// use match_commentator::protocol::format_timestamp;
///
/// assert_eq!(format_timestamp(95.0), "1:35");
/// assert_eq!(format_timestamp(61.9), "1:01");
/// ```
pub fn format_timestamp(seconds: f64) -> String {
    let whole = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Keep a timestamp only if it can be displayed.
///
/// Negative, NaN and infinite values are treated as absent.
pub(crate) fn usable_timestamp(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|s| s.is_finite() && *s >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_minutes_and_seconds() {
        assert_eq!(format_timestamp(95.0), "1:35");
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(59.0), "0:59");
        assert_eq!(format_timestamp(60.0), "1:00");
    }

    #[test]
    fn fractions_truncate_instead_of_rounding() {
        assert_eq!(format_timestamp(61.9), "1:01");
        assert_eq!(format_timestamp(59.999), "0:59");
        assert_eq!(format_timestamp(0.5), "0:00");
    }

    #[test]
    fn minutes_are_not_capped() {
        assert_eq!(format_timestamp(5400.0), "90:00");
        assert_eq!(format_timestamp(6005.2), "100:05");
    }

    #[test]
    fn unusable_timestamps_are_dropped() {
        assert_eq!(usable_timestamp(Some(-1.0)), None);
        assert_eq!(usable_timestamp(Some(f64::NAN)), None);
        assert_eq!(usable_timestamp(Some(f64::INFINITY)), None);
        assert_eq!(usable_timestamp(None), None);
        assert_eq!(usable_timestamp(Some(0.0)), Some(0.0));
        assert_eq!(usable_timestamp(Some(12.5)), Some(12.5));
    }
}
