//! Phone number normalization and SMS verification codes.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::CoreError;

/// Verification codes are five digits from 1-9 so they never start with 0.
pub const VERIFICATION_CODE_LENGTH: usize = 5;

/// Longest SMS body the gateway accepts.
pub const MAX_TEXT_LENGTH: usize = 1600;

static NON_DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D").expect("valid regex"));

pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..VERIFICATION_CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(1..=9u8)))
        .collect()
}

/// Codes are compared after trimming whitespace; an empty stored code never
/// matches.
pub fn code_matches(stored: &str, submitted: &str) -> bool {
    !stored.is_empty() && stored == submitted.trim()
}

/// Strip formatting and store the number as country code plus digits,
/// without a leading `+`. Ten-digit numbers are assumed to be US numbers.
pub fn normalize_phone_number(raw: &str) -> Result<String, CoreError> {
    let digits = NON_DIGIT_RE.replace_all(raw, "").into_owned();
    match digits.len() {
        10 => Ok(format!("1{digits}")),
        11..=15 => Ok(digits),
        _ => Err(CoreError::Validation(format!(
            "Invalid phone number '{raw}'"
        ))),
    }
}

/// E.164 form for the SMS gateway.
pub fn e164(stored: &str) -> String {
    format!("+{stored}")
}

pub fn verification_text(code: &str) -> String {
    format!("Hi! It's Schoolnet :) Your verification code is: {code}")
}

pub fn text_fits(body: &str) -> bool {
    body.chars().count() <= MAX_TEXT_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn codes_are_five_nonzero_digits() {
        for _ in 0..50 {
            let code = generate_verification_code();
            assert_eq!(code.len(), VERIFICATION_CODE_LENGTH);
            assert!(code.chars().all(|c| ('1'..='9').contains(&c)));
        }
    }

    #[test]
    fn code_comparison() {
        assert!(code_matches("12345", " 12345 "));
        assert!(!code_matches("12345", "54321"));
        assert!(!code_matches("", ""));
    }

    #[test]
    fn normalizes_us_numbers() {
        assert_eq!(normalize_phone_number("(555) 555-0100").unwrap(), "15555550100");
        assert_eq!(normalize_phone_number("+1 555 555 0100").unwrap(), "15555550100");
        assert_eq!(e164("15555550100"), "+15555550100");
    }

    #[test]
    fn rejects_short_numbers() {
        assert_matches!(normalize_phone_number("555-0100"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn text_length_limit() {
        assert!(text_fits(&"a".repeat(MAX_TEXT_LENGTH)));
        assert!(!text_fits(&"a".repeat(MAX_TEXT_LENGTH + 1)));
    }
}
