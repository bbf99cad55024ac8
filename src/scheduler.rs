//! Daily reminder sweep.
//!
//! A background task that wakes at the configured local cutoff time, walks
//! every registered profile, and nudges users who have not submitted a
//! record for the local date. One unreachable user never aborts the sweep;
//! sends are spaced out to respect transport rate limits.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::channels::{Channel, OutboundMessage};
use crate::config::{BotConfig, ReminderConfig};
use crate::db::RecordStore;
use crate::error::DatabaseError;
use crate::time::{Clock, local_date, next_cutoff};

/// Eligibility predicate consumed by the sweep: remind exactly the users
/// with no record for the local date. No side effects.
pub async fn should_remind(
    store: &dyn RecordStore,
    user_id: &str,
    date: NaiveDate,
) -> Result<bool, DatabaseError> {
    Ok(!store.record_exists(user_id, date).await?)
}

/// Background reminder task.
pub struct ReminderScheduler {
    store: Arc<dyn RecordStore>,
    channel: Arc<dyn Channel>,
    clock: Arc<dyn Clock>,
    bot: BotConfig,
    reminder: ReminderConfig,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        channel: Arc<dyn Channel>,
        clock: Arc<dyn Clock>,
        bot: BotConfig,
        reminder: ReminderConfig,
    ) -> Self {
        Self {
            store,
            channel,
            clock,
            bot,
            reminder,
        }
    }

    /// Sleep until each day's cutoff, then sweep. Runs until the process
    /// exits.
    pub async fn run(self) {
        loop {
            let now = self.clock.now_utc();
            let next = match next_cutoff(now, self.bot.daily_cutoff, self.bot.utc_offset_hours) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "Cannot compute next reminder time; stopping");
                    return;
                }
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next = %next, "Next reminder sweep scheduled");
            tokio::time::sleep(wait).await;

            self.sweep().await;

            // Ride past the minute boundary so the schedule cannot fire
            // twice for the same cutoff.
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }

    /// One pass over all profiles. Per-user failures are logged and skipped.
    pub async fn sweep(&self) {
        let date = local_date(self.clock.now_utc(), self.bot.utc_offset_hours);

        let profiles = match self.store.list_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::error!(error = %e, "Reminder sweep could not list profiles");
                return;
            }
        };

        tracing::info!(count = profiles.len(), %date, "Starting reminder sweep");

        for profile in profiles {
            match should_remind(self.store.as_ref(), &profile.user_id, date).await {
                Ok(true) => {
                    let message = OutboundMessage::text(format!(
                        "Hi {}! It's time to log today's wellbeing data: sleep, activity, \
                         irritability, and mood. Use /today to begin.",
                        profile.display_name,
                    ));
                    if let Err(e) = self.channel.send(&profile.user_id, &message).await {
                        tracing::warn!(user_id = %profile.user_id, error = %e, "Reminder not delivered");
                    }
                }
                Ok(false) => {
                    tracing::debug!(user_id = %profile.user_id, "Already submitted, skipping reminder");
                }
                Err(e) => {
                    tracing::warn!(user_id = %profile.user_id, error = %e, "Eligibility check failed, skipping");
                }
            }

            tokio::time::sleep(self.reminder.send_delay).await;
        }

        tracing::info!("Reminder sweep finished");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveTime, TimeZone, Utc};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::db::MemoryStore;
    use crate::error::ChannelError;
    use crate::metrics::{AggressionLevel, DailyRecord, MoodLevel, UserProfile};
    use crate::time::testing::FixedClock;

    /// Channel that records deliveries, optionally failing for one user.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        async fn send(
            &self,
            user_id: &str,
            _message: &OutboundMessage,
        ) -> Result<(), ChannelError> {
            if self.fail_for.as_deref() == Some(user_id) {
                return Err(ChannelError::SendFailed {
                    user_id: user_id.to_string(),
                    reason: "blocked".to_string(),
                });
            }
            self.sent.lock().await.push(user_id.to_string());
            Ok(())
        }
    }

    fn bot_config() -> BotConfig {
        BotConfig {
            utc_offset_hours: 5,
            daily_cutoff: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            session_timeout: Duration::from_secs(1800),
            recent_window: 30,
        }
    }

    fn profile(user_id: &str) -> UserProfile {
        UserProfile {
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            age: 30,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    async fn seed_record(store: &MemoryStore, user_id: &str, date: NaiveDate) {
        store
            .upsert_daily_record(&DailyRecord {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                date,
                sleep_hours: 8.0,
                activity_hours: 1.0,
                aggression: AggressionLevel::Low,
                mood: MoodLevel::Good,
                created_at: Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_remind_is_negated_existence() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(should_remind(&store, "u1", date).await.unwrap());

        seed_record(&store, "u1", date).await;
        assert!(!should_remind(&store, "u1", date).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_skips_submitted_and_survives_send_failures() {
        let store = Arc::new(MemoryStore::new());
        for user in ["done", "blocked", "pending"] {
            store.create_or_update_profile(&profile(user)).await.unwrap();
        }

        // 21:30 local (UTC+5) on Jun 1.
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2025, 6, 1, 16, 30, 0).unwrap(),
        ));
        let today = local_date(clock.now_utc(), 5);
        seed_record(&store, "done", today).await;

        let channel = Arc::new(RecordingChannel {
            sent: Mutex::new(Vec::new()),
            fail_for: Some("blocked".to_string()),
        });

        let reminder = ReminderConfig {
            enabled: true,
            send_delay: Duration::from_millis(0),
        };

        let scheduler = ReminderScheduler::new(
            store,
            channel.clone(),
            clock,
            bot_config(),
            reminder,
        );
        scheduler.sweep().await;

        let sent = channel.sent.lock().await;
        // "done" already submitted; "blocked" failed but did not abort the
        // sweep; "pending" still got its reminder.
        assert_eq!(sent.as_slice(), ["pending"]);
    }
}
