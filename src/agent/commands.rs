//! Informational commands: /stats, /export, /help.
//!
//! Split out of the core flow handling so `mod.rs` stays focused on the
//! questionnaire machine.

use crate::agent::Agent;
use crate::channels::OutboundMessage;
use crate::error::{FlowError, Result};

/// Window (days) summarized by /stats.
const STATS_WINDOW: usize = 7;

impl Agent {
    /// Averages over the recent week.
    pub async fn on_stats(&self, user_id: &str) -> Result<OutboundMessage> {
        if self.store.get_profile(user_id).await?.is_none() {
            return Err(FlowError::NotRegistered {
                user_id: user_id.to_string(),
            }
            .into());
        }

        let records = self.recent_with_retry(user_id, STATS_WINDOW).await?;
        if records.is_empty() {
            return Ok(OutboundMessage::text(
                "No data yet. Use /today in the evening to log your first day.",
            ));
        }

        let n = records.len() as f64;
        let avg_sleep: f64 = records.iter().map(|r| r.sleep_hours).sum::<f64>() / n;
        let avg_activity: f64 = records.iter().map(|r| r.activity_hours).sum::<f64>() / n;
        let avg_mood: f64 =
            records.iter().map(|r| f64::from(r.mood.ordinal())).sum::<f64>() / n;
        let avg_aggression: f64 = records
            .iter()
            .map(|r| f64::from(r.aggression.ordinal()))
            .sum::<f64>()
            / n;

        Ok(OutboundMessage::text(format!(
            "Your last {} day(s):\n\
             Sleep: {avg_sleep:.1} h on average\n\
             Activity: {avg_activity:.1} h on average\n\
             Mood: {avg_mood:.1}/5 on average\n\
             Irritability: {avg_aggression:.1}/3 on average",
            records.len(),
        )))
    }

    /// Recent records rendered as CSV, newest first.
    pub async fn on_export(&self, user_id: &str) -> Result<OutboundMessage> {
        if self.store.get_profile(user_id).await?.is_none() {
            return Err(FlowError::NotRegistered {
                user_id: user_id.to_string(),
            }
            .into());
        }

        let records = self
            .recent_with_retry(user_id, self.config.recent_window)
            .await?;
        if records.is_empty() {
            return Ok(OutboundMessage::text("No data to export yet."));
        }

        let mut csv = String::from("date,sleep_hours,activity_hours,aggression_level,mood_level\n");
        for record in &records {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                record.date,
                record.sleep_hours,
                record.activity_hours,
                record.aggression.ordinal(),
                record.mood.ordinal(),
            ));
        }

        Ok(OutboundMessage::text(csv.trim_end().to_string()))
    }

    /// Fixed usage text.
    pub fn on_help(&self) -> OutboundMessage {
        OutboundMessage::text(format!(
            "Vitalis tracks four daily wellbeing metrics and gives you rule-based feedback.\n\n\
             Commands:\n\
             /start - register\n\
             /today - log today's data (after {} local time)\n\
             /stats - averages for the last 7 days\n\
             /export - your data as CSV\n\
             /cancel - abandon the current entry\n\
             /help - this message\n\n\
             Each evening I ask four quick questions: hours slept, hours of activity, \
             irritability, and mood. After you answer, you get an analysis of your recent \
             patterns and a few recommendations.",
            self.config.daily_cutoff.format("%H:%M"),
        ))
    }
}
