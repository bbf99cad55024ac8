//! Embedded libSQL backend for the record store.
//!
//! SQLite-dialect schema, idempotent via `IF NOT EXISTS`. UUIDs and
//! timestamps are stored as TEXT (hex string / ISO-8601), dates as
//! `YYYY-MM-DD` TEXT so the (user_id, date) primary key sorts naturally.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::params;
use uuid::Uuid;

use crate::db::RecordStore;
use crate::error::DatabaseError;
use crate::metrics::{AggressionLevel, DailyRecord, MoodLevel, UserProfile};

/// Consolidated schema. Run once on open; idempotent.
const SCHEMA: &str = r#"

-- ==================== Profiles ====================

CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    age INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- ==================== Daily records ====================

CREATE TABLE IF NOT EXISTS daily_records (
    id TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES profiles(user_id),
    date TEXT NOT NULL,
    sleep_hours REAL NOT NULL,
    activity_hours REAL NOT NULL,
    aggression_level INTEGER NOT NULL,
    mood_level INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, date)
);

CREATE INDEX IF NOT EXISTS idx_daily_records_user_date
    ON daily_records(user_id, date DESC);
"#;

/// Record store backed by a local libSQL database file.
pub struct LibSqlStore {
    db: libsql::Database,
}

impl LibSqlStore {
    /// Open (creating if absent) a local database file and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(e.to_string()))?;

        let store = Self { db };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply the consolidated schema. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db
            .connect()
            .map_err(|e| DatabaseError::Open(e.to_string()))
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(text: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Serialization(format!("invalid timestamp '{text}': {e}")))
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(text: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Serialization(format!("invalid date '{text}': {e}")))
}

/// Convert a libsql row to a DailyRecord.
///
/// Column order: id(0), user_id(1), date(2), sleep_hours(3),
/// activity_hours(4), aggression_level(5), mood_level(6), created_at(7).
fn row_to_record(row: &libsql::Row) -> Result<DailyRecord, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let id: Uuid = id_str
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("invalid record id: {e}")))?;
    let user_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let date_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let sleep_hours: f64 = row
        .get(3)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let activity_hours: f64 = row
        .get(4)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let aggression_raw: i64 = row
        .get(5)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let mood_raw: i64 = row
        .get(6)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let created_str: String = row
        .get(7)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

    let aggression = AggressionLevel::from_ordinal(aggression_raw).ok_or_else(|| {
        DatabaseError::Serialization(format!("invalid aggression level {aggression_raw}"))
    })?;
    let mood = MoodLevel::from_ordinal(mood_raw)
        .ok_or_else(|| DatabaseError::Serialization(format!("invalid mood level {mood_raw}")))?;

    Ok(DailyRecord {
        id,
        user_id,
        date: parse_date(&date_str)?,
        sleep_hours,
        activity_hours,
        aggression,
        mood,
        created_at: parse_ts(&created_str)?,
    })
}

/// Convert a libsql row to a UserProfile.
///
/// Column order: user_id(0), display_name(1), age(2), created_at(3).
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    let user_id: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let display_name: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let age: i64 = row
        .get(2)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
    let created_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

    Ok(UserProfile {
        user_id,
        display_name,
        age: u8::try_from(age)
            .map_err(|_| DatabaseError::Serialization(format!("invalid age {age}")))?,
        created_at: parse_ts(&created_str)?,
    })
}

#[async_trait]
impl RecordStore for LibSqlStore {
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO daily_records \
             (id, user_id, date, sleep_hours, activity_hours, aggression_level, mood_level, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(user_id, date) DO UPDATE SET \
                 sleep_hours = excluded.sleep_hours, \
                 activity_hours = excluded.activity_hours, \
                 aggression_level = excluded.aggression_level, \
                 mood_level = excluded.mood_level",
            params![
                record.id.to_string(),
                record.user_id.as_str(),
                fmt_date(record.date),
                record.sleep_hours,
                record.activity_hours,
                i64::from(record.aggression.ordinal()),
                i64::from(record.mood.ordinal()),
                fmt_ts(record.created_at),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn record_exists(&self, user_id: &str, date: NaiveDate) -> Result<bool, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM daily_records WHERE user_id = ?1 AND date = ?2",
                params![user_id, fmt_date(date)],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let exists = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
            .is_some();
        Ok(exists)
    }

    async fn recent_records(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, date, sleep_hours, activity_hours, \
                        aggression_level, mood_level, created_at \
                 FROM daily_records \
                 WHERE user_id = ?1 \
                 ORDER BY date DESC \
                 LIMIT ?2",
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT user_id, display_name, age, created_at \
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_profile(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_or_update_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO profiles (user_id, display_name, age, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 display_name = excluded.display_name, \
                 age = excluded.age",
            params![
                profile.user_id.as_str(),
                profile.display_name.as_str(),
                i64::from(profile.age),
                fmt_ts(profile.created_at),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT user_id, display_name, age, created_at \
                 FROM profiles ORDER BY created_at",
                params![],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut profiles = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            profiles.push(row_to_profile(&row)?);
        }
        Ok(profiles)
    }

    async fn profile_count(&self) -> Result<u64, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM profiles", params![])
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
            .ok_or_else(|| DatabaseError::Query("COUNT returned no row".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(count as u64)
    }
}
