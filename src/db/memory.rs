//! In-memory record store.
//!
//! Backs unit and integration tests, and `--ephemeral` local runs where no
//! database file is wanted. Same uniqueness semantics as the libSQL backend:
//! one row per (user_id, date), later write wins.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::db::RecordStore;
use crate::error::DatabaseError;
use crate::metrics::{DailyRecord, UserProfile};

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, UserProfile>,
    // Per user, keyed by date so newest-first reads are a reverse scan.
    records: HashMap<String, BTreeMap<NaiveDate, DailyRecord>>,
}

/// Record store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_daily_record(&self, record: &DailyRecord) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner
            .records
            .entry(record.user_id.clone())
            .or_default()
            .insert(record.date, record.clone());
        Ok(())
    }

    async fn record_exists(&self, user_id: &str, date: NaiveDate) -> Result<bool, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .get(user_id)
            .is_some_and(|days| days.contains_key(&date)))
    }

    async fn recent_records(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DailyRecord>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .get(user_id)
            .map(|days| days.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn create_or_update_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        inner
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<UserProfile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(profiles)
    }

    async fn profile_count(&self) -> Result<u64, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.len() as u64)
    }
}
