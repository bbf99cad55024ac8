//! Domain types: user profiles, daily records, and the two ordinal scales.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
///
/// At most one profile per user id. Created by the registration flow on
/// first contact; the core never deletes profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque stable identifier assigned by the transport (chat user id).
    pub user_id: String,
    pub display_name: String,
    /// Validated to 1..=120 at registration.
    pub age: u8,
    pub created_at: DateTime<Utc>,
}

/// Self-reported irritability, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggressionLevel {
    Low,
    Normal,
    High,
}

impl AggressionLevel {
    /// Ordinal value 1..=3, as stored and as used by the analyzer.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Low),
            2 => Some(Self::Normal),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Self-reported mood, very bad to excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLevel {
    VeryBad,
    Bad,
    Neutral,
    Good,
    Excellent,
}

impl MoodLevel {
    /// Ordinal value 1..=5, as stored and as used by the analyzer.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::VeryBad => 1,
            Self::Bad => 2,
            Self::Neutral => 3,
            Self::Good => 4,
            Self::Excellent => 5,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::VeryBad),
            2 => Some(Self::Bad),
            3 => Some(Self::Neutral),
            4 => Some(Self::Good),
            5 => Some(Self::Excellent),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryBad => "very bad",
            Self::Bad => "bad",
            Self::Neutral => "okay",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// One day's four-metric submission for one user.
///
/// Keyed by (user_id, date); the store enforces uniqueness on that pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Calendar date in the configured local offset.
    pub date: NaiveDate,
    /// Hours slept, 0..=24, fractional.
    pub sleep_hours: f64,
    /// Hours of physical activity, 0..=24, fractional.
    pub activity_hours: f64,
    pub aggression: AggressionLevel,
    pub mood: MoodLevel,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggression_ordinal_round_trip() {
        for level in [
            AggressionLevel::Low,
            AggressionLevel::Normal,
            AggressionLevel::High,
        ] {
            assert_eq!(
                AggressionLevel::from_ordinal(i64::from(level.ordinal())),
                Some(level)
            );
        }
        assert_eq!(AggressionLevel::from_ordinal(0), None);
        assert_eq!(AggressionLevel::from_ordinal(4), None);
    }

    #[test]
    fn mood_ordinal_round_trip() {
        for level in [
            MoodLevel::VeryBad,
            MoodLevel::Bad,
            MoodLevel::Neutral,
            MoodLevel::Good,
            MoodLevel::Excellent,
        ] {
            assert_eq!(MoodLevel::from_ordinal(i64::from(level.ordinal())), Some(level));
        }
        assert_eq!(MoodLevel::from_ordinal(6), None);
    }

    #[test]
    fn mood_order_matches_ordinal_order() {
        assert!(MoodLevel::VeryBad < MoodLevel::Excellent);
        assert!(MoodLevel::Bad < MoodLevel::Neutral);
    }
}
