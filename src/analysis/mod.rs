//! Rule-based analysis of a user's recent metric window.
//!
//! Everything here is deterministic: fixed thresholds, fixed label sets,
//! fixed sentence templates. The input is the newest-first record window
//! read back from the store immediately after a submission, so index 0 is
//! today.

pub mod correlation;
pub mod recommend;

use crate::metrics::DailyRecord;

pub use correlation::{insights, pearson};
pub use recommend::recommendations;

/// Records required before any analysis is attempted.
const MIN_RECORDS: usize = 2;

/// Records required before trend statements are made.
const TREND_WINDOW: usize = 3;

/// Sleep-hours margin for the recent-vs-baseline trend.
const SLEEP_TREND_MARGIN: f64 = 0.5;

/// Overall wellbeing score, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(pub f64);

impl Score {
    /// Weighted banding: sleep and activity in three bands worth up to 25
    /// points each, mood scaled linearly to 25, aggression inverted to 25.
    pub fn for_record(record: &DailyRecord) -> Self {
        let sleep_score = if record.sleep_hours >= 7.5 {
            25.0
        } else if record.sleep_hours >= 6.0 {
            15.0
        } else {
            5.0
        };

        let activity_score = if record.activity_hours >= 1.5 {
            25.0
        } else if record.activity_hours >= 0.5 {
            15.0
        } else {
            5.0
        };

        let mood_score = f64::from(record.mood.ordinal()) / 5.0 * 25.0;
        let aggression_score = f64::from(4 - record.aggression.ordinal()) / 3.0 * 25.0;

        Self(sleep_score + activity_score + mood_score + aggression_score)
    }

    pub fn description(self) -> &'static str {
        if self.0 >= 80.0 {
            "Excellent; your habits are in very good shape."
        } else if self.0 >= 60.0 {
            "Good; your habits are at a satisfactory level."
        } else if self.0 >= 40.0 {
            "Average; a few areas could use attention."
        } else {
            "Take note: your habits need more care."
        }
    }
}

/// The composed analysis for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Non-empty narrative sections in fixed order:
    /// sleep, activity, mood, aggression, correlations.
    pub sections: Vec<String>,
    /// Present whenever there was enough data to analyze.
    pub score: Option<Score>,
}

impl AnalysisReport {
    pub fn insufficient() -> Self {
        Self {
            sections: vec![
                "Not enough data to analyze yet. Keep logging for a few more days.".to_string(),
            ],
            score: None,
        }
    }

    /// Render the report as one message body.
    pub fn render(&self) -> String {
        self.sections.join("\n\n")
    }
}

/// Analyze a newest-first window of records.
pub fn analyze(records: &[DailyRecord]) -> AnalysisReport {
    if records.len() < MIN_RECORDS {
        return AnalysisReport::insufficient();
    }

    let today = &records[0];
    let mut sections = Vec::new();

    sections.push(sleep_section(records));
    sections.push(activity_section(records));
    sections.push(mood_section(records));
    sections.push(aggression_section(records));

    let correlations = correlation::insights(records);
    if !correlations.is_empty() {
        sections.push(format!("Patterns: {}", correlations.join(" ")));
    }

    let score = Score::for_record(today);
    sections.push(format!(
        "Overall score: {:.0}/100. {}",
        score.0,
        score.description()
    ));

    AnalysisReport {
        sections,
        score: Some(score),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

fn sleep_section(records: &[DailyRecord]) -> String {
    let today = records[0].sleep_hours;
    let average = mean(records.iter().map(|r| r.sleep_hours));

    let status = if today >= 7.5 {
        "good"
    } else if today >= 6.0 {
        "adequate"
    } else {
        "low"
    };

    let mut trend = String::new();
    if records.len() >= TREND_WINDOW {
        let recent = mean(records.iter().take(TREND_WINDOW).map(|r| r.sleep_hours));
        if recent > average + SLEEP_TREND_MARGIN {
            trend = " Your sleep has improved over the last few days.".to_string();
        } else if recent < average - SLEEP_TREND_MARGIN {
            trend = " Your sleep has shortened over the last few days.".to_string();
        }
    }

    format!("Sleep: {today:.1} h today ({status}). Average: {average:.1} h.{trend}")
}

fn activity_section(records: &[DailyRecord]) -> String {
    let today = records[0].activity_hours;
    let average = mean(records.iter().map(|r| r.activity_hours));

    let status = if today >= 1.5 {
        "good"
    } else if today >= 0.5 {
        "moderate"
    } else {
        "low"
    };

    let comparison = if today > average {
        format!(" That is {:.1} h more than usual.", today - average)
    } else if today < average {
        format!(" That is {:.1} h less than usual.", average - today)
    } else {
        String::new()
    };

    format!("Activity: {today:.1} h today ({status}).{comparison}")
}

fn mood_section(records: &[DailyRecord]) -> String {
    let today = records[0].mood;
    let average = mean(records.iter().map(|r| f64::from(r.mood.ordinal())));

    let mut trend = String::new();
    if records.len() >= TREND_WINDOW {
        // Strictly monotonic over the last three days; ties say nothing.
        let (a, b, c) = (records[0].mood, records[1].mood, records[2].mood);
        if a > b && b > c {
            trend = " Your mood has been improving three days straight.".to_string();
        } else if a < b && b < c {
            trend = " Your mood has been sinking for three days; take care of yourself."
                .to_string();
        }
    }

    format!(
        "Mood: {} ({}/5). Average: {average:.1}/5.{trend}",
        today.label(),
        today.ordinal()
    )
}

fn aggression_section(records: &[DailyRecord]) -> String {
    let today = records[0].aggression;
    let average = mean(records.iter().map(|r| f64::from(r.aggression.ordinal())));

    let comparison = if f64::from(today.ordinal()) <= average {
        "At or below your usual level."
    } else {
        "Above your usual level; worth a thought about what caused it."
    };

    format!(
        "Irritability: {} ({}/3). {comparison}",
        today.label(),
        today.ordinal()
    )
}
