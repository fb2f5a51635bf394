//! Exact-rational parsing and formatting helpers.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;

/// Parses a decimal string such as `-1,234.56` into an exact
/// [`BigRational`]. Accepts an optional leading sign, `,` thousands
/// separators, and an optional fractional part. Returns `None` if the
/// string contains no digits or any other character.
pub fn parse_quantity(text: &str) -> Option<BigRational> {
    let text = text.trim();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut digits = String::with_capacity(rest.len());
    let mut scale = 0usize;
    let mut seen_point = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => {
                digits.push(c);
                if seen_point {
                    scale += 1;
                }
            }
            ',' if !seen_point => {}
            '.' if !seen_point => seen_point = true,
            _ => return None,
        }
    }
    if digits.is_empty() {
        return None;
    }
    let mut numer: BigInt = digits.parse().ok()?;
    if negative {
        numer = -numer;
    }
    let denom = BigInt::from(10u32).pow(scale as u32);
    Some(BigRational::new(numer, denom))
}

/// Formats a quantity with a fixed two-decimal display, independent of the
/// stored rational's exact precision. Ties round away from zero.
pub fn format_quantity(quantity: &BigRational) -> String {
    let cents = (quantity * BigRational::from_integer(BigInt::from(100))).round();
    let cents = cents.to_integer();
    let sign = if cents.is_negative() { "-" } else { "" };
    let abs = cents.abs();
    let hundred = BigInt::from(100);
    format!("{}{}.{:02}", sign, &abs / &hundred, &abs % &hundred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn rational(numer: i64, denom: i64) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    #[test]
    fn parse_plain_and_fractional() {
        assert_eq!(parse_quantity("42"), Some(rational(42, 1)));
        assert_eq!(parse_quantity("3.50"), Some(rational(7, 2)));
        assert_eq!(parse_quantity("-5.32"), Some(rational(-133, 25)));
        assert_eq!(parse_quantity("+0.10"), Some(rational(1, 10)));
        assert_eq!(parse_quantity(".5"), Some(rational(1, 2)));
    }

    #[test]
    fn parse_thousands_separators() {
        assert_eq!(parse_quantity("1,234.56"), Some(rational(123456, 100)));
        assert_eq!(parse_quantity("12,345,678"), Some(rational(12345678, 1)));
    }

    #[test]
    fn parse_rejects_junk() {
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("-"), None);
        assert_eq!(parse_quantity("1.2.3"), None);
        assert_eq!(parse_quantity("12a"), None);
    }

    #[test]
    fn format_two_decimals() {
        assert_eq!(format_quantity(&rational(7, 2)), "3.50");
        assert_eq!(format_quantity(&rational(-133, 25)), "-5.32");
        assert_eq!(format_quantity(&rational(5, 1)), "5.00");
        assert_eq!(format_quantity(&rational(3, 10)), "0.30");
        assert_eq!(format_quantity(&rational(123456, 100)), "1234.56");
    }

    #[test]
    fn exact_sum_has_no_drift() {
        let sum = parse_quantity("0.10").unwrap() + parse_quantity("0.20").unwrap();
        assert_eq!(sum, rational(3, 10));
    }
}
