//! USD currency formatting for listing prices.

use serde::{Deserialize, Serialize};

/// A listing price as stored remotely: either numeric or pre-formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Number(0.0)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Number(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Number(value as f64)
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

/// Formats an amount as whole US dollars, e.g. `1234567.4` -> `"$1,234,567"`.
///
/// Missing, zero and empty values render as `"$0"`. Text that already starts
/// with `$` is returned unchanged; other text is parsed as a leading decimal
/// number and falls back to `"$0"` when nothing numeric is found.
pub fn format_currency(value: Option<&Amount>) -> String {
    let number = match value {
        None => return "$0".to_string(),
        Some(Amount::Number(n)) => *n,
        Some(Amount::Text(text)) => {
            if text.starts_with('$') {
                return text.clone();
            }
            match parse_leading_number(text) {
                Some(n) => n,
                None => return "$0".to_string(),
            }
        }
    };

    if number == 0.0 || !number.is_finite() {
        return "$0".to_string();
    }

    // Half away from zero, matching en-US currency rounding.
    let rounded = number.abs().round() as u64;
    let grouped = group_thousands(rounded);
    if number < 0.0 && rounded > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn parse_leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer = digits_from(end);
    end += integer;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        end += 1 + fraction;
    }
    if integer + fraction == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits_from(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }
    trimmed[..end].parse::<f64>().ok()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_zero_render_as_zero_dollars() {
        assert_eq!(format_currency(None), "$0");
        assert_eq!(format_currency(Some(&Amount::Number(0.0))), "$0");
        assert_eq!(format_currency(Some(&Amount::from(""))), "$0");
    }

    #[test]
    fn test_numbers_are_grouped_without_cents() {
        assert_eq!(format_currency(Some(&Amount::from(950_i64))), "$950");
        assert_eq!(format_currency(Some(&Amount::from(1_250_000_i64))), "$1,250,000");
        assert_eq!(format_currency(Some(&Amount::from(999_999.5))), "$1,000,000");
        assert_eq!(format_currency(Some(&Amount::from(-4200.0))), "-$4,200");
    }

    #[test]
    fn test_preformatted_text_is_untouched() {
        let amount = Amount::from("$1,100,000");
        assert_eq!(format_currency(Some(&amount)), "$1,100,000");
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        assert_eq!(format_currency(Some(&Amount::from("725000"))), "$725,000");
        assert_eq!(format_currency(Some(&Amount::from("725000.75 USD"))), "$725,001");
        assert_eq!(format_currency(Some(&Amount::from("call agent"))), "$0");
    }

    #[test]
    fn test_numeric_text_with_exponent() {
        assert_eq!(format_currency(Some(&Amount::from("1e5"))), "$100,000");
        assert_eq!(format_currency(Some(&Amount::from("2.5E+6 firm"))), "$2,500,000");
        assert_eq!(format_currency(Some(&Amount::from("4e"))), "$4");
        assert_eq!(format_currency(Some(&Amount::from("7e-x"))), "$7");
    }

    #[test]
    fn test_amount_deserializes_from_number_or_string() {
        let n: Amount = serde_json::from_str("450000").unwrap();
        assert_eq!(n, Amount::Number(450000.0));
        let s: Amount = serde_json::from_str("\"$450,000\"").unwrap();
        assert_eq!(s, Amount::Text("$450,000".to_string()));
    }
}
