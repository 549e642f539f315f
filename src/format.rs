//! Display formatting for Kenyan-shilling amounts, percentages and counts.

const CURRENCY: &str = "KES";

/// Formats an amount as `KES 1,234,567`, keeping up to two decimals and
/// dropping trailing zeros (`KES 1,234.5`). Non-finite input renders as zero.
pub fn format_kes(value: f64) -> String {
    let value = finite_or_zero(value);
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let fraction = match cents % 100 {
        0 => String::new(),
        f if f % 10 == 0 => format!(".{}", f / 10),
        f => format!(".{:02}", f),
    };
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{} {}{}", sign, CURRENCY, whole, fraction)
}

/// Formats an amount in millions with one decimal: `KES 12.3M`.
pub fn format_kes_millions(value: f64) -> String {
    format!("{} {:.1}M", CURRENCY, finite_or_zero(value) / 1_000_000.0)
}

/// Formats a percentage to a fixed number of decimals: `85.0%`.
pub fn format_pct(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, finite_or_zero(value))
}

/// Formats a server-reported percentage verbatim: `85.5%`, `90%`.
pub fn format_reported_pct(value: f64) -> String {
    format!("{}%", finite_or_zero(value))
}

/// Formats a count with thousands separators: `12,480`.
pub fn format_count(value: u64) -> String {
    group_thousands(value)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_kes_whole_amounts() {
        assert_eq!(format_kes(200_000.0), "KES 200,000");
        assert_eq!(format_kes(0.0), "KES 0");
        assert_eq!(format_kes(999.0), "KES 999");
        assert_eq!(format_kes(1_000.0), "KES 1,000");
        assert_eq!(format_kes(12_345_678.0), "KES 12,345,678");
    }

    #[test]
    fn test_format_kes_fractions() {
        assert_eq!(format_kes(1_234.5), "KES 1,234.5");
        assert_eq!(format_kes(1_234.567), "KES 1,234.57");
        assert_eq!(format_kes(0.004), "KES 0");
    }

    #[test]
    fn test_format_kes_negative_and_non_finite() {
        assert_eq!(format_kes(-2_500.0), "-KES 2,500");
        assert_eq!(format_kes(f64::NAN), "KES 0");
        assert_eq!(format_kes(f64::INFINITY), "KES 0");
    }

    #[test]
    fn test_percentages() {
        assert_eq!(format_pct(85.0, 1), "85.0%");
        assert_eq!(format_pct(84.96, 1), "85.0%");
        assert_eq!(format_pct(f64::NAN, 1), "0.0%");
        assert_eq!(format_reported_pct(85.5), "85.5%");
        assert_eq!(format_reported_pct(90.0), "90%");
    }

    #[test]
    fn test_millions_and_counts() {
        assert_eq!(format_kes_millions(12_340_000.0), "KES 12.3M");
        assert_eq!(format_kes_millions(0.0), "KES 0.0M");
        assert_eq!(format_count(12_480), "12,480");
        assert_eq!(format_count(7), "7");
    }
}
