//! Pearson correlation over the metric window and the derived insights.

use crate::metrics::DailyRecord;

/// Minimum window length before any correlation is computed.
pub const MIN_SAMPLES: usize = 5;

/// Magnitude threshold below which no insight is emitted.
pub const INSIGHT_THRESHOLD: f64 = 0.6;

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns 0.0 for mismatched or too-short inputs and for degenerate
/// (no-variance) series where the denominator would be 0; callers never
/// see NaN.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Cross-metric insights for the window, in fixed pair order:
/// sleep-mood, activity-mood, sleep-aggression.
///
/// Each pair is evaluated independently; an insight is emitted only when
/// |r| exceeds the threshold, with direction-specific phrasing. Zero to
/// three sentences may result.
pub fn insights(records: &[DailyRecord]) -> Vec<String> {
    if records.len() < MIN_SAMPLES {
        return Vec::new();
    }

    let sleep: Vec<f64> = records.iter().map(|r| r.sleep_hours).collect();
    let activity: Vec<f64> = records.iter().map(|r| r.activity_hours).collect();
    let mood: Vec<f64> = records.iter().map(|r| f64::from(r.mood.ordinal())).collect();
    let aggression: Vec<f64> = records
        .iter()
        .map(|r| f64::from(r.aggression.ordinal()))
        .collect();

    let mut out = Vec::new();

    let sleep_mood = pearson(&sleep, &mood);
    if sleep_mood.abs() > INSIGHT_THRESHOLD {
        if sleep_mood > 0.0 {
            out.push("On days when you sleep more, your mood tends to be better.".to_string());
        } else {
            out.push(
                "Your sleep and mood appear inversely related; something besides rest may be \
                 driving your mood."
                    .to_string(),
            );
        }
    }

    let activity_mood = pearson(&activity, &mood);
    if activity_mood.abs() > INSIGHT_THRESHOLD {
        if activity_mood > 0.0 {
            out.push("Days with more physical activity line up with a better mood.".to_string());
        } else {
            out.push(
                "Physical activity seems to line up with a worse mood; consider easing the \
                 intensity."
                    .to_string(),
            );
        }
    }

    let sleep_aggression = pearson(&sleep, &aggression);
    if sleep_aggression.abs() > INSIGHT_THRESHOLD {
        if sleep_aggression < 0.0 {
            out.push("On days with less sleep you tend to be more irritable.".to_string());
        } else {
            out.push(
                "More sleep appears to coincide with higher irritability, which is unusual; \
                 look for other causes."
                    .to_string(),
            );
        }
    }

    out
}
