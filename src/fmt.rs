/// Group the integer digits of an already-formatted number with commas.
fn with_commas(digits: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Format a float as money with thousands separators: ₹1,234.56
pub fn money(val: f64, symbol: &str) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let sign = if val < 0.0 && cents != "0.00" { "-" } else { "" };
    format!("{sign}{symbol}{}.{dec_part}", with_commas(int_part))
}

/// Whole-unit money with thousands separators: ₹50,000
pub fn money_whole(val: f64, symbol: &str) -> String {
    let units = format!("{:.0}", val.abs());
    let sign = if val < 0.0 && units != "0" { "-" } else { "" };
    format!("{sign}{symbol}{}", with_commas(&units))
}

/// Round to two decimal places, the precision every report value is emitted at.
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56, "$"), "$1,234.56");
        assert_eq!(money(-500.00, "$"), "-$500.00");
        assert_eq!(money(0.0, "₹"), "₹0.00");
        assert_eq!(money(1000000.99, "₹"), "₹1,000,000.99");
        assert_eq!(money(42.10, "€"), "€42.10");
    }

    #[test]
    fn test_money_whole() {
        assert_eq!(money_whole(50000.0, "₹"), "₹50,000");
        assert_eq!(money_whole(999.4, "₹"), "₹999");
        assert_eq!(money_whole(1234567.0, "$"), "$1,234,567");
        assert_eq!(money_whole(-30000.0, "₹"), "-₹30,000");
        assert_eq!(money_whole(-0.2, "₹"), "₹0");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(-1.234), -1.23);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(75.0), "75.0%");
        assert_eq!(percent(-12.345), "-12.3%");
    }
}
