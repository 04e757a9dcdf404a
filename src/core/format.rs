//! Number formatting for the terminal pages.
//!
//! Figures are grouped the way `en-NZ` locale output looks: `,` between
//! thousands, `.` as the decimal point, and no trailing fraction zeros.

use crate::core::currency::Currency;

/// Fraction digits used when no explicit precision is asked for.
pub const LOCALE_FRACTION_DIGITS: usize = 3;

const MAX_SUB_UNIT_DIGITS: usize = 8;
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Whether `value` sits exactly halfway between two neighbours at `digits`
/// fraction digits, i.e. `value * 2 * 10^digits` is an odd integer.
fn is_decimal_tie(value: f64, digits: usize) -> bool {
    if !value.is_finite() || value == 0.0 {
        return false;
    }
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    // value = odd * 2^exponent once the mantissa's trailing zeros are folded in
    let exponent = exponent + i64::from(mantissa.trailing_zeros());
    exponent == -(digits as i64 + 1)
}

/// Fixed-point text with ties rounded away from zero, as `toFixed` does.
fn to_fixed(value: f64, digits: usize) -> String {
    let value = if is_decimal_tie(value, digits) {
        // one ulp further from zero breaks the tie in that direction
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    };
    format!("{:.*}", digits, value)
}

/// Formats `value` with thousands separators and at most `max_fraction_digits`
/// fraction digits.
pub fn format_number(value: f64, max_fraction_digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let rounded = to_fixed(value.abs(), max_fraction_digits);
    let trimmed = trim_fraction(&rounded);
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (trimmed, None),
    };

    let is_zero = trimmed.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Fraction digits needed to show roughly four significant digits of a
/// sub-unit amount.
fn sub_unit_digits(value: f64) -> usize {
    let leading_zeros = (-value.abs().log10()).floor().max(0.0) as usize;
    (leading_zeros + 4).min(MAX_SUB_UNIT_DIGITS)
}

/// Formats a monetary amount with the currency symbol in front, e.g. `$65,123.45`.
pub fn format_money(value: f64, currency: Currency) -> String {
    let digits = if value != 0.0 && value.abs() < 1.0 {
        sub_unit_digits(value)
    } else {
        LOCALE_FRACTION_DIGITS
    };
    let number = format_number(value.abs(), digits);
    let sign = if value < 0.0 && number.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{}{number}", currency.symbol())
}

/// Formats a percentage change to one decimal place, e.g. `-3.4%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", to_fixed(value, 1))
}

/// Direction of a percentage change as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Gain,
    Loss,
    Unknown,
}

impl Delta {
    /// Classifies on the one-decimal value that is shown, so `-0.04` counts
    /// as a gain because it renders as zero.
    pub fn classify(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => {
                let shown: f64 = to_fixed(v, 1).parse().unwrap_or(v);
                if shown >= 0.0 { Delta::Gain } else { Delta::Loss }
            }
            _ => Delta::Unknown,
        }
    }
}

/// Short form for large totals: `1.23T`, `456.7B`, `12.3M`, `4.5K`.
pub fn format_compact(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    // The unit is chosen after rounding so 999,999 reads 1M rather than 1000K.
    for (scale, suffix) in UNITS {
        let scaled = to_fixed(value / scale, 2);
        let shown: f64 = scaled.parse().unwrap_or(0.0);
        if shown.abs() >= 1.0 {
            return format!("{}{suffix}", trim_fraction(&scaled));
        }
    }
    format_number(value, 2)
}

/// Renders a price series as a row of block glyphs at most `width` wide.
pub fn sparkline(series: &[f64], width: usize) -> String {
    let values: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let buckets: Vec<f64> = if values.len() <= width {
        values
    } else {
        (0..width)
            .map(|i| {
                let start = i * values.len() / width;
                let end = ((i + 1) * values.len() / width).max(start + 1);
                let chunk = &values[start..end];
                chunk.iter().sum::<f64>() / chunk.len() as f64
            })
            .collect()
    };

    let min = buckets.iter().copied().fold(f64::INFINITY, f64::min);
    let max = buckets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    buckets
        .iter()
        .map(|v| {
            if range <= f64::EPSILON {
                SPARK_GLYPHS[0]
            } else {
                let idx = (((v - min) / range) * (SPARK_GLYPHS.len() - 1) as f64).round();
                SPARK_GLYPHS[idx as usize]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_groups_thousands() {
        assert_eq!(format_number(0.0, 3), "0");
        assert_eq!(format_number(999.0, 3), "999");
        assert_eq!(format_number(1000.0, 3), "1,000");
        assert_eq!(format_number(1234567.891, 3), "1,234,567.891");
        assert_eq!(format_number(65432.1, 3), "65,432.1");
        assert_eq!(format_number(2.5e12, 3), "2,500,000,000,000");
    }

    #[test]
    fn test_format_number_rounds_and_trims() {
        assert_eq!(format_number(1.23456, 3), "1.235");
        assert_eq!(format_number(1.5, 0), "2");
        assert_eq!(format_number(10.100, 3), "10.1");
        assert_eq!(format_number(0.0001, 3), "0");
    }

    #[test]
    fn test_format_number_negative_and_special() {
        assert_eq!(format_number(-1234.5, 3), "-1,234.5");
        assert_eq!(format_number(-0.0001, 3), "0");
        assert_eq!(format_number(f64::NAN, 3), "NaN");
        assert_eq!(format_number(f64::INFINITY, 3), "∞");
        assert_eq!(format_number(f64::NEG_INFINITY, 3), "-∞");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(65123.456, Currency::Nzd), "$65,123.456");
        assert_eq!(format_money(1.0, Currency::Eur), "€1");
        assert_eq!(format_money(0.4512, Currency::Usd), "$0.4512");
        assert_eq!(format_money(0.00001234, Currency::Usd), "$0.00001234");
        assert_eq!(format_money(-250.5, Currency::Gbp), "-£250.5");
        assert_eq!(format_money(0.0, Currency::Aud), "$0");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(2.345), "2.3%");
        assert_eq!(format_percent(-12.0), "-12.0%");
        assert_eq!(format_percent(-0.04), "-0.0%");
    }

    #[test]
    fn test_ties_round_away_from_zero() {
        assert_eq!(format_percent(0.25), "0.3%");
        assert_eq!(format_percent(1.25), "1.3%");
        assert_eq!(format_percent(-0.25), "-0.3%");
        assert_eq!(format_number(2.5, 0), "3");
        assert_eq!(format_number(1.0625, 3), "1.063");
        assert_eq!(format_number(-2.5, 0), "-3");
        // 1.005 is stored just below the midpoint, so it rounds down
        assert_eq!(format_number(1.005, 2), "1");
        assert_eq!(Delta::classify(Some(-0.25)), Delta::Loss);
    }

    #[test]
    fn test_delta_classification() {
        assert_eq!(Delta::classify(Some(1.2)), Delta::Gain);
        assert_eq!(Delta::classify(Some(0.0)), Delta::Gain);
        assert_eq!(Delta::classify(Some(-0.04)), Delta::Gain);
        assert_eq!(Delta::classify(Some(-0.06)), Delta::Loss);
        assert_eq!(Delta::classify(None), Delta::Unknown);
        assert_eq!(Delta::classify(Some(f64::NAN)), Delta::Unknown);
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(2_345_678_901_234.0), "2.35T");
        assert_eq!(format_compact(456_700_000_000.0), "456.7B");
        assert_eq!(format_compact(12_300_000.0), "12.3M");
        assert_eq!(format_compact(4_500.0), "4.5K");
        assert_eq!(format_compact(950.25), "950.25");
        assert_eq!(format_compact(999_999.0), "1M");
        assert_eq!(format_compact(999_999_999_999.0), "1T");
        assert_eq!(format_compact(994_000_000.0), "994M");
        assert_eq!(format_compact(996_000_000.0), "1B");
        assert_eq!(format_compact(-3_000_000.0), "-3M");
    }

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[], 10), "");
        assert_eq!(sparkline(&[1.0, 2.0], 0), "");
        assert_eq!(sparkline(&[5.0, 5.0, 5.0], 10), "▁▁▁");
        assert_eq!(sparkline(&[1.0, 8.0], 10), "▁█");

        let rising: Vec<f64> = (0..168).map(f64::from).collect();
        let line = sparkline(&rising, 24);
        assert_eq!(line.chars().count(), 24);
        assert!(line.starts_with('▁'));
        assert!(line.ends_with('█'));
    }
}
