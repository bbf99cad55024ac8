//! Pure input validators for the daily questionnaire.
//!
//! Each takes the raw text or choice token handed over by the transport and
//! returns either a validated value or a typed rejection. No side effects;
//! the session machine re-prompts on rejection without advancing.

use crate::error::ValidationError;
use crate::metrics::{AggressionLevel, MoodLevel};

/// Closed vocabulary for the aggression keyboard. Token first, display label second.
pub const AGGRESSION_CHOICES: &[(&str, &str)] = &[
    ("low", "Low"),
    ("normal", "Normal"),
    ("high", "High"),
];

/// Closed vocabulary for the mood keyboard. Token first, display label second.
pub const MOOD_CHOICES: &[(&str, &str)] = &[
    ("1", "\u{1F621}"),
    ("2", "\u{1F610}"),
    ("3", "\u{1F642}"),
    ("4", "\u{1F603}"),
    ("5", "\u{1F929}"),
];

fn parse_hours(text: &str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    // Accept a decimal comma, common on mobile keyboards.
    let normalized = trimmed.replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| ValidationError::NotANumber {
            input: trimmed.to_string(),
        })?;
    if !value.is_finite() || !(0.0..=24.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            value,
            min: 0.0,
            max: 24.0,
        });
    }
    Ok(value)
}

/// Parse and range-check hours slept, 0..=24.
pub fn sleep_hours(text: &str) -> Result<f64, ValidationError> {
    parse_hours(text)
}

/// Parse and range-check hours of physical activity, 0..=24.
pub fn activity_hours(text: &str) -> Result<f64, ValidationError> {
    parse_hours(text)
}

/// Map an aggression choice token to its level.
///
/// Accepts the canonical tokens plus the bare digits, so a transport that
/// forwards a typed "2" instead of a button tap still validates.
pub fn aggression(token: &str) -> Result<AggressionLevel, ValidationError> {
    match token.trim().to_lowercase().as_str() {
        "low" | "1" => Ok(AggressionLevel::Low),
        "normal" | "2" => Ok(AggressionLevel::Normal),
        "high" | "3" => Ok(AggressionLevel::High),
        other => Err(ValidationError::UnknownOption {
            token: other.to_string(),
        }),
    }
}

/// Map a mood choice token to its level.
///
/// The vocabulary is the digits 1..=5 and the five mood emoji the keyboard
/// renders.
pub fn mood(token: &str) -> Result<MoodLevel, ValidationError> {
    match token.trim() {
        "1" | "\u{1F621}" => Ok(MoodLevel::VeryBad),
        "2" | "\u{1F610}" => Ok(MoodLevel::Bad),
        "3" | "\u{1F642}" => Ok(MoodLevel::Neutral),
        "4" | "\u{1F603}" => Ok(MoodLevel::Good),
        "5" | "\u{1F929}" => Ok(MoodLevel::Excellent),
        other => Err(ValidationError::UnknownOption {
            token: other.to_string(),
        }),
    }
}

/// Parse and range-check an age, 1..=120. Used by the registration flow.
pub fn age(text: &str) -> Result<u8, ValidationError> {
    let trimmed = text.trim();
    let value: i64 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
        input: trimmed.to_string(),
    })?;
    if !(1..=120).contains(&value) {
        return Err(ValidationError::OutOfRange {
            value: value as f64,
            min: 1.0,
            max: 120.0,
        });
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_hours_accepts_valid_range() {
        assert_eq!(sleep_hours("7.5").unwrap(), 7.5);
        assert_eq!(sleep_hours("0").unwrap(), 0.0);
        assert_eq!(sleep_hours("24").unwrap(), 24.0);
        assert_eq!(sleep_hours(" 8 ").unwrap(), 8.0);
    }

    #[test]
    fn sleep_hours_accepts_decimal_comma() {
        assert_eq!(sleep_hours("7,5").unwrap(), 7.5);
    }

    #[test]
    fn sleep_hours_rejects_out_of_range() {
        assert!(matches!(
            sleep_hours("24.5"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            sleep_hours("-1"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn sleep_hours_rejects_non_numeric() {
        assert!(matches!(
            sleep_hours("eight"),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(matches!(
            sleep_hours(""),
            Err(ValidationError::NotANumber { .. })
        ));
        // NaN and infinity parse as f64 but are not valid hours.
        assert!(matches!(
            sleep_hours("NaN"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            sleep_hours("inf"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn activity_hours_same_bounds_as_sleep() {
        assert_eq!(activity_hours("1.5").unwrap(), 1.5);
        assert!(activity_hours("25").is_err());
    }

    #[test]
    fn aggression_tokens() {
        assert_eq!(aggression("low").unwrap(), AggressionLevel::Low);
        assert_eq!(aggression("Normal").unwrap(), AggressionLevel::Normal);
        assert_eq!(aggression("HIGH").unwrap(), AggressionLevel::High);
        assert_eq!(aggression("2").unwrap(), AggressionLevel::Normal);
        assert!(matches!(
            aggression("furious"),
            Err(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn mood_tokens() {
        assert_eq!(mood("1").unwrap(), MoodLevel::VeryBad);
        assert_eq!(mood("5").unwrap(), MoodLevel::Excellent);
        assert_eq!(mood("\u{1F642}").unwrap(), MoodLevel::Neutral);
        assert!(matches!(
            mood("6"),
            Err(ValidationError::UnknownOption { .. })
        ));
        assert!(matches!(
            mood("great"),
            Err(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn age_bounds() {
        assert_eq!(age("30").unwrap(), 30);
        assert_eq!(age("1").unwrap(), 1);
        assert_eq!(age("120").unwrap(), 120);
        assert!(matches!(age("0"), Err(ValidationError::OutOfRange { .. })));
        assert!(matches!(age("121"), Err(ValidationError::OutOfRange { .. })));
        assert!(matches!(
            age("thirty"),
            Err(ValidationError::NotANumber { .. })
        ));
    }
}
