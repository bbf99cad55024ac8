//! End-to-end conversation tests: registration, the gated daily
//! questionnaire, analysis output, and the informational commands, driven
//! through the public agent surface with an in-memory store and a pinned
//! clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use vitalis::agent::Agent;
use vitalis::channels::{Command, OutboundMessage, UserInput};
use vitalis::config::BotConfig;
use vitalis::db::{MemoryStore, RecordStore};
use vitalis::error::{Error, FlowError};
use vitalis::metrics::{AggressionLevel, DailyRecord, MoodLevel};
use vitalis::time::Clock;

/// Clock pinned to an instant, advanceable by hand.
struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    fn advance(&self, duration: chrono::Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn bot_config() -> BotConfig {
    BotConfig {
        utc_offset_hours: 5,
        daily_cutoff: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        session_timeout: Duration::from_secs(30 * 60),
        recent_window: 30,
    }
}

/// 21:30 local time (UTC+5) on 2025-06-01: past the cutoff.
fn evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 16, 30, 0).unwrap()
}

fn setup() -> (Arc<Agent>, Arc<MemoryStore>, Arc<FixedClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::at(evening()));
    let agent = Arc::new(Agent::new(store.clone(), clock.clone(), bot_config()));
    (agent, store, clock)
}

async fn text(agent: &Agent, user: &str, input: &str) -> OutboundMessage {
    agent.handle(user, UserInput::Text(input.to_string())).await
}

async fn choice(agent: &Agent, user: &str, token: &str) -> OutboundMessage {
    agent
        .handle(user, UserInput::Choice(token.to_string()))
        .await
}

async fn register(agent: &Agent, user: &str, name: &str) {
    agent.handle(user, UserInput::Command(Command::Start)).await;
    text(agent, user, name).await;
    let reply = text(agent, user, "30").await;
    assert!(
        reply.text.contains("All set"),
        "registration should complete: {}",
        reply.text
    );
}

/// Answer all four questionnaire prompts and return the final reply.
async fn submit_day(
    agent: &Agent,
    user: &str,
    sleep: &str,
    activity: &str,
    aggression: &str,
    mood: &str,
) -> OutboundMessage {
    text(agent, user, sleep).await;
    text(agent, user, activity).await;
    choice(agent, user, aggression).await;
    choice(agent, user, mood).await
}

#[tokio::test]
async fn registration_then_full_daily_flow_stores_exactly_one_record() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    let prompt = agent.on_trigger_daily_flow("u1").await.unwrap();
    assert!(prompt.text.contains("hours did you sleep"));

    let reply = submit_day(&agent, "u1", "7.5", "1.5", "low", "4").await;
    assert!(reply.text.contains("Saved"), "got: {}", reply.text);

    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    assert!(store.record_exists("u1", date).await.unwrap());

    let records = store.recent_records("u1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sleep_hours, 7.5);
    assert_eq!(records[0].activity_hours, 1.5);
    assert_eq!(records[0].aggression, AggressionLevel::Low);
    assert_eq!(records[0].mood, MoodLevel::Good);

    // Idempotent re-query.
    assert!(store.record_exists("u1", date).await.unwrap());
}

#[tokio::test]
async fn trigger_before_cutoff_fails_too_early() {
    let store = Arc::new(MemoryStore::new());
    // 15:00 local time.
    let clock = Arc::new(FixedClock::at(
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
    ));
    let agent = Agent::new(store.clone(), clock, bot_config());
    register(&agent, "u1", "Ada").await;

    let err = agent.on_trigger_daily_flow("u1").await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::TooEarly { .. })));

    // And through the transport surface it becomes explanatory text.
    let reply = agent
        .handle("u1", UserInput::Command(Command::Today))
        .await;
    assert!(reply.text.contains("21:00"), "got: {}", reply.text);
}

#[tokio::test]
async fn second_submission_same_day_is_gated_with_no_extra_write() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    agent.on_trigger_daily_flow("u1").await.unwrap();
    submit_day(&agent, "u1", "8", "2", "low", "5").await;

    let err = agent.on_trigger_daily_flow("u1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Flow(FlowError::AlreadySubmitted { .. })
    ));

    let records = store.recent_records("u1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn unregistered_user_cannot_enter_the_flow() {
    let (agent, _store, _clock) = setup();
    let err = agent.on_trigger_daily_flow("ghost").await.unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::NotRegistered { .. })));
}

#[tokio::test]
async fn invalid_answers_reprompt_without_advancing() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;
    agent.on_trigger_daily_flow("u1").await.unwrap();

    // Unparsable, then out of range: both re-ask for sleep.
    let reply = text(&agent, "u1", "a lot").await;
    assert!(reply.text.contains("hours did you sleep"), "got: {}", reply.text);
    let reply = text(&agent, "u1", "25").await;
    assert!(reply.text.contains("hours did you sleep"), "got: {}", reply.text);

    // A valid answer still lands in the right field.
    let reply = text(&agent, "u1", "7").await;
    assert!(reply.text.contains("physical activity"), "got: {}", reply.text);

    text(&agent, "u1", "1").await;
    let reply = choice(&agent, "u1", "shrug").await;
    assert!(reply.text.contains("irritable"), "got: {}", reply.text);

    choice(&agent, "u1", "normal").await;
    submit_tail(&agent, "u1").await;

    let records = store.recent_records("u1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sleep_hours, 7.0);
    assert_eq!(records[0].aggression, AggressionLevel::Normal);
}

async fn submit_tail(agent: &Agent, user: &str) {
    let reply = choice(agent, user, "3").await;
    assert!(reply.text.contains("Saved"), "got: {}", reply.text);
}

#[tokio::test]
async fn cancel_discards_partial_data() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;
    agent.on_trigger_daily_flow("u1").await.unwrap();
    text(&agent, "u1", "8").await;

    let reply = agent.on_cancel("u1").await.unwrap();
    assert!(reply.text.contains("discarded"), "got: {}", reply.text);

    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    assert!(!store.record_exists("u1", date).await.unwrap());

    // The next answer has no session to land in.
    let err = agent
        .on_answer("u1", UserInput::Text("8".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::NoActiveSession { .. })));
}

#[tokio::test]
async fn idle_session_expires_and_flow_restarts_fresh() {
    let (agent, _store, clock) = setup();
    register(&agent, "u1", "Ada").await;
    agent.on_trigger_daily_flow("u1").await.unwrap();
    text(&agent, "u1", "8").await; // now awaiting activity

    clock.advance(chrono::Duration::minutes(31));

    // The stale answer is not resumed.
    let err = agent
        .on_answer("u1", UserInput::Text("1.5".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Flow(FlowError::NoActiveSession { .. })));

    // Re-entering starts over at the first prompt.
    let prompt = agent.on_trigger_daily_flow("u1").await.unwrap();
    assert!(prompt.text.contains("hours did you sleep"));
}

#[tokio::test]
async fn trigger_while_flow_active_reemits_current_prompt() {
    let (agent, _store, _clock) = setup();
    register(&agent, "u1", "Ada").await;
    agent.on_trigger_daily_flow("u1").await.unwrap();
    text(&agent, "u1", "8").await; // now awaiting activity

    let reply = agent.on_trigger_daily_flow("u1").await.unwrap();
    assert!(
        reply.text.contains("physical activity"),
        "should stay on the activity prompt: {}",
        reply.text
    );
}

#[tokio::test]
async fn completion_reply_contains_analysis_and_recommendations() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    // Seed yesterday so the analyzer has two records to work with.
    seed(&store, "u1", 31, 8.0, MoodLevel::Good).await;

    agent.on_trigger_daily_flow("u1").await.unwrap();
    let reply = submit_day(&agent, "u1", "5", "0.2", "high", "1").await;

    assert!(reply.text.contains("Sleep:"), "got: {}", reply.text);
    assert!(reply.text.contains("Irritability:"));
    assert!(reply.text.contains("Overall score:"));
    assert!(reply.text.contains("Recommendations:"));
    // The worst-case day fires the sleep, activity, mood, and aggression rules.
    assert!(reply.text.contains("7-8 hours of sleep"));
    assert!(reply.text.contains("30 minutes"));
    assert!(reply.text.contains("low mood"));
    assert!(reply.text.contains("ease tension"));
    // The closing tips always appear.
    assert!(reply.text.contains("routine"));
    assert!(reply.text.contains("balanced"));
}

#[tokio::test]
async fn anti_correlated_history_surfaces_a_pattern() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    // Five prior days with sleep rising as mood falls. Today's record
    // (sleep 1 h, mood excellent) keeps the inverse relationship intact.
    let moods = [
        MoodLevel::VeryBad,
        MoodLevel::Bad,
        MoodLevel::Neutral,
        MoodLevel::Good,
        MoodLevel::Excellent,
    ];
    for (i, mood) in moods.iter().enumerate() {
        seed(&store, "u1", 27 + i as u32, 6.0 - i as f64, *mood).await;
    }

    agent.on_trigger_daily_flow("u1").await.unwrap();
    let reply = submit_day(&agent, "u1", "0.5", "1", "low", "5").await;
    assert!(
        reply.text.contains("Patterns:"),
        "expected a correlation insight: {}",
        reply.text
    );
}

#[tokio::test]
async fn stats_reports_weekly_averages() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    seed(&store, "u1", 30, 6.0, MoodLevel::Neutral).await;
    seed(&store, "u1", 31, 8.0, MoodLevel::Excellent).await;

    let reply = agent.on_stats("u1").await.unwrap();
    assert!(reply.text.contains("2 day(s)"), "got: {}", reply.text);
    assert!(reply.text.contains("7.0 h"), "got: {}", reply.text);
    assert!(reply.text.contains("4.0/5"), "got: {}", reply.text);
}

#[tokio::test]
async fn export_renders_csv() {
    let (agent, store, _clock) = setup();
    register(&agent, "u1", "Ada").await;
    seed(&store, "u1", 31, 7.5, MoodLevel::Good).await;

    let reply = agent.on_export("u1").await.unwrap();
    let mut lines = reply.text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,sleep_hours,activity_hours,aggression_level,mood_level"
    );
    assert_eq!(lines.next().unwrap(), "2025-05-31,7.5,1,1,4");
}

#[tokio::test]
async fn should_remind_tracks_submission() {
    let (agent, _store, _clock) = setup();
    register(&agent, "u1", "Ada").await;

    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    assert!(agent.should_remind("u1", date).await.unwrap());

    agent.on_trigger_daily_flow("u1").await.unwrap();
    submit_day(&agent, "u1", "8", "2", "low", "4").await;
    assert!(!agent.should_remind("u1", date).await.unwrap());
}

/// Insert a record for May `day` directly into the store.
async fn seed(store: &MemoryStore, user: &str, day: u32, sleep: f64, mood: MoodLevel) {
    store
        .upsert_daily_record(&DailyRecord {
            id: Uuid::new_v4(),
            user_id: user.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            sleep_hours: sleep,
            activity_hours: 1.0,
            aggression: AggressionLevel::Low,
            mood,
            created_at: Utc.with_ymd_and_hms(2025, 5, day, 16, 0, 0).unwrap(),
        })
        .await
        .unwrap();
}
