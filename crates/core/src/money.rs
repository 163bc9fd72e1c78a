use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("unparsable amount: {0:?}")]
    Unparsable(String),
}

/// Parses a statement amount into cents.
///
/// Accepts accounting parentheses for negatives, currency symbols, thousands
/// separators in either convention, and a European decimal comma:
/// `"(1.234,56)"`, `"$1,234.56"` and `"-1234.56"` all come back as `-123456`
/// or `123456` with the matching sign.
pub fn parse_amount(raw: &str) -> Result<i64, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    // Parentheses mean negative: (123.45) -> -123.45
    let (negative, body) = if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() > 2
    {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let stripped: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ' ' | '\u{a0}'))
        .collect();

    let normalized = normalize_separators(&stripped);

    let decimal =
        Decimal::from_str(&normalized).map_err(|_| AmountError::Unparsable(raw.to_string()))?;
    // Scaling to cents can overflow `Decimal` or `i64`; either way the value
    // is unparsable, not a panic.
    let cents = decimal
        .checked_mul(Decimal::from(100))
        .and_then(|scaled| scaled.round().to_i64())
        .ok_or_else(|| AmountError::Unparsable(raw.to_string()))?;
    if negative {
        cents
            .checked_neg()
            .ok_or_else(|| AmountError::Unparsable(raw.to_string()))
    } else {
        Ok(cents)
    }
}

// Decides which of ',' and '.' is the decimal separator. When both appear the
// rightmost one wins; a lone comma followed by one or two digits is a decimal
// comma, any other comma is a thousands separator.
fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if dot > comma {
                s.chars().filter(|&c| c != ',').collect()
            } else {
                let no_dots: String = s.chars().filter(|&c| c != '.').collect();
                no_dots.replace(',', ".")
            }
        }
        (Some(_), None) => {
            let tail_len = s.rsplit(',').next().map_or(0, str::len);
            if s.matches(',').count() == 1 && (1..=2).contains(&tail_len) {
                s.replace(',', ".")
            } else {
                s.chars().filter(|&c| c != ',').collect()
            }
        }
        _ => s.to_string(),
    }
}

/// Canonical two-decimal rendering of a cent amount: `-4532` -> `"-45.32"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_amounts() {
        assert_eq!(parse_amount("45.32"), Ok(4532));
        assert_eq!(parse_amount("-45.32"), Ok(-4532));
        assert_eq!(parse_amount("+10"), Ok(1000));
        assert_eq!(parse_amount("0"), Ok(0));
    }

    #[test]
    fn parentheses_negate() {
        assert_eq!(parse_amount("(123.45)"), Ok(-12345));
        assert_eq!(parse_amount(" (5.00) "), Ok(-500));
    }

    #[test]
    fn strips_currency_and_thousands() {
        assert_eq!(parse_amount("$1,234.56"), Ok(123456));
        assert_eq!(parse_amount("€ 2.500,00"), Ok(250000));
        assert_eq!(parse_amount("1 234.56"), Ok(123456));
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(parse_amount("45,32"), Ok(4532));
        assert_eq!(parse_amount("-7,5"), Ok(-750));
        assert_eq!(parse_amount("1.234,56"), Ok(123456));
    }

    #[test]
    fn lone_comma_with_three_digits_is_thousands() {
        assert_eq!(parse_amount("1,234"), Ok(123400));
    }

    #[test]
    fn rounds_sub_cent_precision() {
        assert_eq!(parse_amount("45.329"), Ok(4533));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(parse_amount("   "), Err(AmountError::Empty));
        assert!(matches!(
            parse_amount("n/a"),
            Err(AmountError::Unparsable(_))
        ));
    }

    #[test]
    fn rejects_amounts_beyond_cent_range() {
        // Parses as a Decimal but cannot be scaled by 100.
        assert!(matches!(
            parse_amount("1000000000000000000000000000"),
            Err(AmountError::Unparsable(_))
        ));
        // Scales fine as a Decimal but exceeds i64 cents.
        assert!(matches!(
            parse_amount("100000000000000000"),
            Err(AmountError::Unparsable(_))
        ));
        // Parenthesized i64::MIN cents cannot be negated.
        assert!(matches!(
            parse_amount("(-92233720368547758.08)"),
            Err(AmountError::Unparsable(_))
        ));
    }

    #[test]
    fn formats_cents() {
        assert_eq!(format_cents(-4532), "-45.32");
        assert_eq!(format_cents(250000), "2500.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-5), "-0.05");
        assert_eq!(format_cents(0), "0.00");
    }
}
