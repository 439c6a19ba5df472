use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tradepost_audit::RoleDirectory;
use tradepost_auth::{PasswordHistory, SessionWatermark};
use tradepost_core::SubjectId;

/// Per-subject credential state.
///
/// The head of `history` is the current password. History and the
/// session-invalidation watermark live in one record so they are updated
/// atomically together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub subject: SubjectId,
    pub email: String,
    pub is_store: bool,
    pub is_admin: bool,
    pub mfa_verified: bool,
    pub history: PasswordHistory,
    pub sessions_invalidated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(subject: SubjectId, email: impl Into<String>, history: PasswordHistory) -> Self {
        Self {
            subject,
            email: email.into(),
            is_store: false,
            is_admin: false,
            mfa_verified: false,
            history,
            sessions_invalidated_at: None,
        }
    }

    pub fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.history.current().map(|record| record.changed_at)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialStoreError {
    #[error("user record not found")]
    NotFound,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write access to per-subject credential records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, subject: &SubjectId) -> Result<UserRecord, CredentialStoreError>;

    /// Apply one read-modify-write against the subject's record.
    ///
    /// Implementations must make the whole closure atomic with respect to
    /// concurrent updates of the same subject.
    async fn update(
        &self,
        subject: &SubjectId,
        apply: Box<dyn for<'a> FnOnce(&'a mut UserRecord) + Send>,
    ) -> Result<(), CredentialStoreError>;

    async fn insert(&self, record: UserRecord) -> Result<(), CredentialStoreError>;
}

/// In-memory credential store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<SubjectId, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, subject: &SubjectId) -> Result<UserRecord, CredentialStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| CredentialStoreError::Unavailable("lock poisoned".to_string()))?;
        records
            .get(subject)
            .cloned()
            .ok_or(CredentialStoreError::NotFound)
    }

    async fn update(
        &self,
        subject: &SubjectId,
        apply: Box<dyn for<'a> FnOnce(&'a mut UserRecord) + Send>,
    ) -> Result<(), CredentialStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| CredentialStoreError::Unavailable("lock poisoned".to_string()))?;
        let record = records
            .get_mut(subject)
            .ok_or(CredentialStoreError::NotFound)?;
        apply(record);
        Ok(())
    }

    async fn insert(&self, record: UserRecord) -> Result<(), CredentialStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| CredentialStoreError::Unavailable("lock poisoned".to_string()))?;
        records.insert(record.subject, record);
        Ok(())
    }
}

impl SessionWatermark for InMemoryCredentialStore {
    fn invalidated_at(&self, subject: &SubjectId) -> Option<DateTime<Utc>> {
        self.records
            .read()
            .ok()?
            .get(subject)
            .and_then(|record| record.sessions_invalidated_at)
    }
}

#[async_trait]
impl RoleDirectory for InMemoryCredentialStore {
    async fn is_admin(&self, subject: &SubjectId) -> bool {
        // Fail-closed: an unknown subject (or a poisoned lock) is not admin.
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(subject).map(|record| record.is_admin))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_auth::HISTORY_CAPACITY;

    fn record(subject: SubjectId) -> UserRecord {
        UserRecord::new(
            subject,
            "user@example.com",
            PasswordHistory::starting_with("digest:p1".to_string(), Utc::now()),
        )
    }

    #[tokio::test]
    async fn get_after_insert_round_trips() {
        let store = InMemoryCredentialStore::new();
        let subject = SubjectId::new();
        store.insert(record(subject)).await.unwrap();

        let fetched = store.get(&subject).await.unwrap();
        assert_eq!(fetched.subject, subject);
        assert_eq!(fetched.history.len(), 1);
    }

    #[tokio::test]
    async fn missing_subject_is_not_found() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(
            store.get(&SubjectId::new()).await,
            Err(CredentialStoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn update_applies_history_and_watermark_together() {
        let store = InMemoryCredentialStore::new();
        let subject = SubjectId::new();
        store.insert(record(subject)).await.unwrap();

        let now = Utc::now();
        store
            .update(
                &subject,
                Box::new(move |rec| {
                    rec.history.push("digest:p2".to_string(), now);
                    rec.sessions_invalidated_at = Some(now);
                }),
            )
            .await
            .unwrap();

        let fetched = store.get(&subject).await.unwrap();
        assert_eq!(fetched.history.len(), 2);
        assert_eq!(fetched.history.current().unwrap().hash, "digest:p2");
        assert_eq!(fetched.sessions_invalidated_at, Some(now));
        assert_eq!(store.invalidated_at(&subject), Some(now));
        assert!(fetched.history.len() <= HISTORY_CAPACITY);
    }

    #[tokio::test]
    async fn role_directory_is_fail_closed() {
        let store = InMemoryCredentialStore::new();
        let subject = SubjectId::new();
        assert!(!store.is_admin(&subject).await);

        let mut rec = record(subject);
        rec.is_admin = true;
        store.insert(rec).await.unwrap();
        assert!(store.is_admin(&subject).await);
    }
}
