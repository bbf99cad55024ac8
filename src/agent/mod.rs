//! The conversation engine.
//!
//! Routes classified transport input through the per-user session machine:
//! registration (name, age), the gated daily questionnaire (sleep, activity,
//! aggression, mood), and the commands around them. On the final answer it
//! commits exactly one record, then immediately runs the analyzer and the
//! recommendation rules and replies with the composed narrative.

pub mod commands;
pub mod session;

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::analysis;
use crate::channels::{Command, OutboundMessage, UserInput};
use crate::config::BotConfig;
use crate::db::RecordStore;
use crate::error::{DatabaseError, Error, FlowError, Result};
use crate::metrics::{DailyRecord, MoodLevel, UserProfile};
use crate::time::{Clock, local_date, local_time};
use crate::validate;
use session::{Session, SessionManager, Stage};

const GENERIC_FAILURE: &str =
    "Something went wrong on my side. Please try again in a moment.";

/// The conversation engine: one instance serves all users.
pub struct Agent {
    store: Arc<dyn RecordStore>,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    config: BotConfig,
}

impl Agent {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, config: BotConfig) -> Self {
        Self {
            store,
            sessions: SessionManager::new(config.session_timeout),
            clock,
            config,
        }
    }

    /// The local calendar date right now, under the configured offset.
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now_utc(), self.config.utc_offset_hours)
    }

    /// Entry point for the transport: classify errors into user-facing text.
    ///
    /// Flow gates keep their explanatory wording; everything else collapses
    /// to a generic failure so internals never leak into chat.
    pub async fn handle(&self, user_id: &str, input: UserInput) -> OutboundMessage {
        let result = match input {
            UserInput::Command(Command::Start) => self.on_start(user_id).await,
            UserInput::Command(Command::Today) => self.on_trigger_daily_flow(user_id).await,
            UserInput::Command(Command::Cancel) => self.on_cancel(user_id).await,
            UserInput::Command(Command::Stats) => self.on_stats(user_id).await,
            UserInput::Command(Command::Export) => self.on_export(user_id).await,
            UserInput::Command(Command::Help) => Ok(self.on_help()),
            other => self.on_answer(user_id, other).await,
        };

        match result {
            Ok(message) => message,
            Err(Error::Flow(e)) => OutboundMessage::text(flow_message(&e)),
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to handle input");
                OutboundMessage::text(GENERIC_FAILURE)
            }
        }
    }

    /// First contact: welcome and begin registration, or greet a known user.
    pub async fn on_start(&self, user_id: &str) -> Result<OutboundMessage> {
        if let Some(profile) = self.store.get_profile(user_id).await? {
            return Ok(OutboundMessage::text(format!(
                "Hi {}, you're already registered. Use /today after {} local time to log \
                 your day.",
                profile.display_name,
                self.config.daily_cutoff.format("%H:%M"),
            )));
        }

        let now = self.clock.now_utc();
        self.sessions
            .put(user_id, Session::registration(now))
            .await;
        tracing::info!(user_id, "Starting registration");

        Ok(OutboundMessage::text(
            "Welcome to Vitalis, your daily wellbeing log. What should I call you?",
        ))
    }

    /// Gate checks, then the first questionnaire prompt.
    pub async fn on_trigger_daily_flow(&self, user_id: &str) -> Result<OutboundMessage> {
        let now = self.clock.now_utc();

        // A trigger while a flow is active is input to that flow, not a new
        // session: re-emit the current prompt.
        if let Some(active) = self.sessions.take(user_id, now).await {
            let prompt = match active.stage {
                Stage::AwaitingName | Stage::AwaitingAge => OutboundMessage::text(
                    "Let's finish your registration first. ".to_string()
                        + &prompt_for_stage(active.stage).text,
                ),
                stage => prompt_for_stage(stage),
            };
            self.sessions.put(user_id, active).await;
            return Ok(prompt);
        }

        let profile = self.store.get_profile(user_id).await?;
        if profile.is_none() {
            return Err(FlowError::NotRegistered {
                user_id: user_id.to_string(),
            }
            .into());
        }

        let local_now = local_time(now, self.config.utc_offset_hours);
        if local_now < self.config.daily_cutoff {
            return Err(FlowError::TooEarly {
                cutoff: self.config.daily_cutoff,
                now: local_now,
            }
            .into());
        }

        let date = local_date(now, self.config.utc_offset_hours);
        if self.record_exists_with_retry(user_id, date).await? {
            return Err(FlowError::AlreadySubmitted { date }.into());
        }

        self.sessions
            .put(user_id, Session::daily_entry(date, now))
            .await;
        tracing::info!(user_id, %date, "Starting daily entry");

        Ok(prompt_for_stage(Stage::AwaitingSleep))
    }

    /// Discard the active flow, if any.
    pub async fn on_cancel(&self, user_id: &str) -> Result<OutboundMessage> {
        let now = self.clock.now_utc();
        if self.sessions.cancel(user_id, now).await {
            tracing::info!(user_id, "Session cancelled");
            Ok(OutboundMessage::text(
                "Okay, discarded. Use /today whenever you want to start over.",
            ))
        } else {
            Ok(OutboundMessage::text("Nothing to cancel."))
        }
    }

    /// Advance the active session with one answer.
    pub async fn on_answer(&self, user_id: &str, input: UserInput) -> Result<OutboundMessage> {
        let now = self.clock.now_utc();
        let Some(mut session) = self.sessions.take(user_id, now).await else {
            return Err(FlowError::NoActiveSession {
                user_id: user_id.to_string(),
            }
            .into());
        };
        session.touch(now);

        // Free text and choice taps carry the same payload for validation;
        // the distinction only matters to the transport.
        let answer = match input {
            UserInput::Text(text) | UserInput::Choice(text) => text,
            UserInput::Command(_) => {
                // Commands are routed before on_answer; keep the session.
                self.sessions.put(user_id, session).await;
                return Err(FlowError::NoActiveSession {
                    user_id: user_id.to_string(),
                }
                .into());
            }
        };

        match session.stage {
            Stage::AwaitingName => {
                let name = answer.trim();
                if name.is_empty() || name.len() > 100 {
                    self.sessions.put(user_id, session).await;
                    return Ok(OutboundMessage::text(
                        "That doesn't look like a name I can use. What should I call you?",
                    ));
                }
                session.draft.name = Some(name.to_string());
                session.stage = Stage::AwaitingAge;
                self.sessions.put(user_id, session).await;
                Ok(prompt_for_stage(Stage::AwaitingAge))
            }

            Stage::AwaitingAge => match validate::age(&answer) {
                Ok(age) => {
                    let name = session
                        .draft
                        .name
                        .clone()
                        .unwrap_or_else(|| user_id.to_string());
                    let profile = UserProfile {
                        user_id: user_id.to_string(),
                        display_name: name.clone(),
                        age,
                        created_at: now,
                    };
                    if let Err(e) = self.create_profile_with_retry(&profile).await {
                        tracing::error!(user_id, error = %e, "Failed to store profile");
                        return Ok(OutboundMessage::text(
                            "I couldn't save your profile. Please /start again.",
                        ));
                    }
                    tracing::info!(user_id, "Registration complete");
                    Ok(OutboundMessage::text(format!(
                        "All set, {name}. Every evening after {} local time, use /today and \
                         I'll ask four quick questions about your day: sleep, activity, \
                         irritability, and mood.",
                        self.config.daily_cutoff.format("%H:%M"),
                    )))
                }
                Err(e) => {
                    self.sessions.put(user_id, session).await;
                    Ok(corrective(&e.to_string(), Stage::AwaitingAge))
                }
            },

            Stage::AwaitingSleep => match validate::sleep_hours(&answer) {
                Ok(hours) => {
                    session.draft.sleep_hours = Some(hours);
                    session.stage = Stage::AwaitingActivity;
                    self.sessions.put(user_id, session).await;
                    Ok(prompt_for_stage(Stage::AwaitingActivity))
                }
                Err(e) => {
                    self.sessions.put(user_id, session).await;
                    Ok(corrective(&e.to_string(), Stage::AwaitingSleep))
                }
            },

            Stage::AwaitingActivity => match validate::activity_hours(&answer) {
                Ok(hours) => {
                    session.draft.activity_hours = Some(hours);
                    session.stage = Stage::AwaitingAggression;
                    self.sessions.put(user_id, session).await;
                    Ok(prompt_for_stage(Stage::AwaitingAggression))
                }
                Err(e) => {
                    self.sessions.put(user_id, session).await;
                    Ok(corrective(&e.to_string(), Stage::AwaitingActivity))
                }
            },

            Stage::AwaitingAggression => match validate::aggression(&answer) {
                Ok(level) => {
                    session.draft.aggression = Some(level);
                    session.stage = Stage::AwaitingMood;
                    self.sessions.put(user_id, session).await;
                    Ok(prompt_for_stage(Stage::AwaitingMood))
                }
                Err(e) => {
                    self.sessions.put(user_id, session).await;
                    Ok(corrective(&e.to_string(), Stage::AwaitingAggression))
                }
            },

            Stage::AwaitingMood => match validate::mood(&answer) {
                Ok(mood) => self.complete_entry(user_id, session, mood).await,
                Err(e) => {
                    self.sessions.put(user_id, session).await;
                    Ok(corrective(&e.to_string(), Stage::AwaitingMood))
                }
            },
        }
    }

    /// Reminder eligibility: true when the user has not recorded this date.
    pub async fn should_remind(&self, user_id: &str, date: NaiveDate) -> Result<bool> {
        Ok(!self.record_exists_with_retry(user_id, date).await?)
    }

    /// Commit the finished questionnaire and respond with the analysis.
    async fn complete_entry(
        &self,
        user_id: &str,
        session: Session,
        mood: MoodLevel,
    ) -> Result<OutboundMessage> {
        let now = self.clock.now_utc();
        let date = session
            .entry_date
            .unwrap_or_else(|| local_date(now, self.config.utc_offset_hours));

        // The awaiting stages fill the draft in order; a hole here is a bug
        // in the machine, not user input, so fail the session rather than
        // guess values.
        let (Some(sleep_hours), Some(activity_hours), Some(aggression)) = (
            session.draft.sleep_hours,
            session.draft.activity_hours,
            session.draft.aggression,
        ) else {
            tracing::error!(user_id, "Session completed with an incomplete draft");
            return Ok(OutboundMessage::text(
                "Something went wrong with this entry. Please /today to start over.",
            ));
        };

        let record = DailyRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            date,
            sleep_hours,
            activity_hours,
            aggression,
            mood,
            created_at: now,
        };

        // The session is already out of the table; on failure it stays
        // destroyed and no partial data persists.
        if let Err(e) = self.upsert_with_retry(&record).await {
            tracing::error!(user_id, %date, error = %e, "Failed to store daily record");
            return Ok(OutboundMessage::text(
                "I couldn't save today's data. Nothing was recorded; please /today to try \
                 again.",
            ));
        }
        tracing::info!(user_id, %date, "Daily record stored");

        // Read back the window for analysis. The record is committed at this
        // point, so a failed read degrades to a today-only window instead of
        // failing the whole submission.
        let window = match self.recent_with_retry(user_id, self.config.recent_window).await {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => vec![record.clone()],
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Falling back to today-only window");
                vec![record.clone()]
            }
        };

        let report = analysis::analyze(&window);
        let advice = analysis::recommendations(&window);

        let mut text = String::from("Saved. Here's today's look at your data.\n\n");
        text.push_str(&report.render());
        text.push_str("\n\nRecommendations:\n");
        for item in &advice {
            text.push_str("- ");
            text.push_str(item);
            text.push('\n');
        }

        Ok(OutboundMessage::text(text.trim_end().to_string()))
    }

    // ==================== Store access (retry-once policy) ====================

    async fn record_exists_with_retry(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> std::result::Result<bool, DatabaseError> {
        match self.store.record_exists(user_id, date).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "record_exists failed, retrying once");
                self.store.record_exists(user_id, date).await
            }
        }
    }

    async fn upsert_with_retry(
        &self,
        record: &DailyRecord,
    ) -> std::result::Result<(), DatabaseError> {
        match self.store.upsert_daily_record(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(user_id = %record.user_id, error = %e, "upsert failed, retrying once");
                self.store.upsert_daily_record(record).await
            }
        }
    }

    async fn recent_with_retry(
        &self,
        user_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<DailyRecord>, DatabaseError> {
        match self.store.recent_records(user_id, limit).await {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "recent_records failed, retrying once");
                self.store.recent_records(user_id, limit).await
            }
        }
    }

    async fn create_profile_with_retry(
        &self,
        profile: &UserProfile,
    ) -> std::result::Result<(), DatabaseError> {
        match self.store.create_or_update_profile(profile).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(user_id = %profile.user_id, error = %e, "profile write failed, retrying once");
                self.store.create_or_update_profile(profile).await
            }
        }
    }
}

/// The prompt (and keyboard) for a stage.
fn prompt_for_stage(stage: Stage) -> OutboundMessage {
    match stage {
        Stage::AwaitingName => {
            OutboundMessage::text("What should I call you?")
        }
        Stage::AwaitingAge => {
            OutboundMessage::text("How old are you? (a number between 1 and 120)")
        }
        Stage::AwaitingSleep => OutboundMessage::text(
            "How many hours did you sleep last night? (for example: 7.5)",
        ),
        Stage::AwaitingActivity => OutboundMessage::text(
            "How many hours of physical activity did you get today? (for example: 1.5)",
        ),
        Stage::AwaitingAggression => OutboundMessage::with_choices(
            "How irritable were you today?",
            validate::AGGRESSION_CHOICES,
        ),
        Stage::AwaitingMood => {
            OutboundMessage::with_choices("How was your mood today?", validate::MOOD_CHOICES)
        }
    }
}

/// Re-emit the stage prompt with a corrective preamble.
fn corrective(reason: &str, stage: Stage) -> OutboundMessage {
    let prompt = prompt_for_stage(stage);
    OutboundMessage {
        text: format!("{reason}. {}", prompt.text),
        choices: prompt.choices,
    }
}

/// User-facing wording for flow gate errors.
fn flow_message(error: &FlowError) -> String {
    match error {
        FlowError::TooEarly { .. } => error.to_string(),
        FlowError::AlreadySubmitted { .. } => {
            "You've already submitted today's data. Come back tomorrow evening.".to_string()
        }
        FlowError::NotRegistered { .. } => {
            "You're not registered yet. Use /start to sign up.".to_string()
        }
        FlowError::NoActiveSession { .. } => {
            "I wasn't expecting an answer right now. Use /today to log your day, or /help \
             for the command list."
                .to_string()
        }
    }
}
