//! Deterministic recommendation rules.
//!
//! Each rule is evaluated independently against today's record and the
//! recent window, in a fixed order; every rule whose condition holds
//! appends its advice. The two closing tips always fire, so the result is
//! never shorter than two entries.

use crate::metrics::{AggressionLevel, DailyRecord, MoodLevel};

/// Window length for the sleep-consistency and weekday-mood checks.
const WEEKLY_WINDOW: usize = 7;

/// Sleep stddev (hours) above which the schedule counts as inconsistent.
const SLEEP_STDDEV_LIMIT: f64 = 2.0;

/// Generate the ordered advice list for the window.
///
/// `records` is newest-first with today at index 0. An empty window yields
/// only the closing tips.
pub fn recommendations(records: &[DailyRecord]) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(today) = records.first() {
        // Rule 1: sleep quantity. The branches cannot both fire.
        if today.sleep_hours < 7.0 {
            out.push(
                "Aim for 7-8 hours of sleep tomorrow; good sleep lifts mood and focus."
                    .to_string(),
            );
        } else if today.sleep_hours > 9.0 {
            out.push(
                "Oversleeping works against you too; 7-8 hours is the sweet spot.".to_string(),
            );
        }

        // Rule 2: activity quantity.
        if today.activity_hours < 0.5 {
            out.push(
                "Get at least 30 minutes of exercise tomorrow; even a walk counts.".to_string(),
            );
        } else if today.activity_hours < 1.0 {
            out.push("Try to raise your activity; an hour a day is the ideal.".to_string());
        }

        // Rule 3: low mood, with a sleep linkage note when both apply.
        if today.mood <= MoodLevel::Bad {
            out.push(
                "For a low mood: talk to a friend, do something you enjoy, or take a walk \
                 outdoors."
                    .to_string(),
            );
            if today.sleep_hours < 7.0 {
                out.push("Short sleep may be dragging your mood down.".to_string());
            }
        }

        // Rule 4: high aggression, with an escalation warning if the last
        // three days have all been at least elevated.
        if today.aggression >= AggressionLevel::High {
            out.push(
                "To ease tension: deep breathing, meditation, or physical exercise.".to_string(),
            );
            if records.len() >= 3
                && records[..3]
                    .iter()
                    .all(|r| r.aggression >= AggressionLevel::Normal)
            {
                out.push(
                    "Irritability has stayed elevated for several days; try to pin down the \
                     source of the stress."
                        .to_string(),
                );
            }
        }
    }

    // Rule 5: weekly patterns, only with a full week of data.
    if records.len() >= WEEKLY_WINDOW {
        let sleep: Vec<f64> = records[..WEEKLY_WINDOW]
            .iter()
            .map(|r| r.sleep_hours)
            .collect();
        if std_dev(&sleep) > SLEEP_STDDEV_LIMIT {
            out.push(
                "Your sleep schedule is uneven; settling on a regular bedtime would help."
                    .to_string(),
            );
        }

        // Weekend/weekday approximation: the two most recent days against
        // the five before them.
        let recent_mood = mean_mood(&records[..2]);
        let earlier_mood = mean_mood(&records[2..WEEKLY_WINDOW]);
        if recent_mood > earlier_mood + 0.5 {
            out.push(
                "Your mood is noticeably better on days off; look for ways to bring some of \
                 that into the working week."
                    .to_string(),
            );
        }
    }

    // Rule 6: fixed closing tips, always last.
    out.push(
        "Keep a steady routine: consistent sleep and wake times, regular meals.".to_string(),
    );
    out.push(
        "Eat balanced: more fruit and vegetables, fewer processed foods.".to_string(),
    );

    out
}

fn mean_mood(records: &[DailyRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| f64::from(r.mood.ordinal())).sum();
    sum / records.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
