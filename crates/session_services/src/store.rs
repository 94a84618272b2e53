use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{SessionError, SessionId, SessionRecord};

/// Persistence for session documents, keyed by session id.
///
/// Implementations are shared by every worker, so they must be `Send + Sync`.
/// `load` never returns an expired record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the live record for `id`.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError>;

    /// Inserts or replaces the record for `id`.
    async fn save(&self, id: &SessionId, record: &SessionRecord) -> Result<(), SessionError>;

    /// Extends the lifetime of an unchanged record without rewriting its fields.
    async fn touch(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
        touched_at: DateTime<Utc>,
    ) -> Result<(), SessionError>;

    /// Removes the record for `id`. Removing a missing record is not an error.
    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Physically removes expired records, returning how many were dropped.
    async fn purge_expired(&self) -> Result<u64, SessionError>;
}

/// Session store kept in process memory.
///
/// Sessions are lost on restart and are not shared between processes.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no record.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let records = self.lock();
        Ok(records
            .get(id)
            .filter(|record| !record.is_expired(Utc::now()))
            .cloned())
    }

    async fn save(&self, id: &SessionId, record: &SessionRecord) -> Result<(), SessionError> {
        self.lock().insert(id.clone(), record.clone());
        Ok(())
    }

    async fn touch(
        &self,
        id: &SessionId,
        expires_at: DateTime<Utc>,
        touched_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if let Some(record) = self.lock().get_mut(id) {
            record.expires_at = expires_at;
            record.touched_at = touched_at;
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.lock().remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let now = Utc::now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}
