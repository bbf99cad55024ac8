//! Persistence layer: the record store contract and its backends.

pub mod libsql;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::metrics::{DailyRecord, UserProfile};

pub use self::libsql::LibSqlStore;
pub use self::memory::MemoryStore;

/// Store contract the conversation core depends on.
///
/// Uniqueness on (user_id, date) is the backend's responsibility: a second
/// upsert for the same pair replaces the prior row and must never create a
/// duplicate. The engine treats failures as retryable-once, then surfaces a
/// generic failure to the user.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for (record.user_id, record.date).
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<(), DatabaseError>;

    /// Whether a record exists for the pair.
    async fn record_exists(&self, user_id: &str, date: NaiveDate) -> Result<bool, DatabaseError>;

    /// Up to `limit` records for the user, newest date first.
    async fn recent_records(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Insert or replace the profile for profile.user_id.
    async fn create_or_update_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// All registered profiles, for the reminder sweep.
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError>;

    /// Number of registered profiles, for the health endpoint.
    async fn profile_count(&self) -> Result<u64, DatabaseError>;
}
