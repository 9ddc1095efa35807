//! Tick, tooltip and label formatting.

use chrono::NaiveDate;

/// Abbreviates a magnitude with a B, M or K suffix and one decimal.
#[must_use]
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{value:.1}")
    }
}

/// Percentage with two decimals.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// Price tooltip line.
#[must_use]
pub fn format_price(value: f64) -> String {
    format!("Price: ${value:.2}")
}

/// Axis and tooltip date label, e.g. `Dec 2023`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

fn nonzero(data: &[Option<f64>], index: usize) -> Option<f64> {
    data.get(index).copied().flatten().filter(|v| *v != 0.0 && v.is_finite())
}

/// Growth annotation for the point at `index`.
///
/// Compares with the point four positions back (` (YoY: +x.x%)`), or with
/// the previous point (` (QoQ: ...)`) when that one is missing or zero.
/// Empty when the current point or both comparison points are missing or
/// zero.
#[must_use]
pub fn growth_annotation(data: &[Option<f64>], index: usize) -> String {
    let Some(current) = nonzero(data, index) else {
        return String::new();
    };

    let (tag, previous) = match index.checked_sub(4).and_then(|i| nonzero(data, i)) {
        Some(previous) => ("YoY", previous),
        None => match index.checked_sub(1).and_then(|i| nonzero(data, i)) {
            Some(previous) => ("QoQ", previous),
            None => return String::new(),
        },
    };

    let growth = (current - previous) / previous.abs() * 100.0;
    let sign = if growth > 0.0 { "+" } else { "" };
    format!(" ({tag}: {sign}{growth:.1}%)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1_234_000_000.0, "1.2B")]
    #[case(-5_500_000.0, "-5.5M")]
    #[case(12_345.0, "12.3K")]
    #[case(999.0, "999.0")]
    #[case(f64::NAN, "")]
    fn test_format_value(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_value(value), expected);
    }

    #[test]
    fn test_units() {
        assert_eq!(format_percent(12.346), "12.35%");
        assert_eq!(format_price(50.0), "Price: $50.00");
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(format_date(d), "Dec 2023");
    }

    #[test]
    fn test_growth_prefers_year_over_year() {
        let data = [Some(100.0), Some(110.0), Some(120.0), Some(130.0), Some(150.0)];
        assert_eq!(growth_annotation(&data, 4), " (YoY: +50.0%)");
        assert_eq!(growth_annotation(&data, 1), " (QoQ: +10.0%)");
        assert_eq!(growth_annotation(&data, 0), "");
    }

    #[test]
    fn test_growth_falls_back_and_handles_gaps() {
        let data = [Some(0.0), Some(100.0), None, Some(80.0), Some(40.0)];
        // Four back is zero, so compare with the previous point.
        assert_eq!(growth_annotation(&data, 4), " (QoQ: -50.0%)");
        assert_eq!(growth_annotation(&data, 3), "");
        assert_eq!(growth_annotation(&data, 2), "");
    }

    #[test]
    fn test_growth_uses_absolute_base() {
        let data = [Some(-100.0), Some(-50.0)];
        assert_eq!(growth_annotation(&data, 1), " (QoQ: +50.0%)");
    }
}
