use std::sync::RwLock;

use async_trait::async_trait;

use tradepost_audit::{AuditStore, AuditStoreError, LogQuery, SecurityLogEntry};

/// In-memory append-only audit store.
///
/// Intended for tests/dev. Entries are kept in arrival order; queries return
/// newest-first with the limit applied server-side.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<SecurityLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far (test observation hook).
    pub fn all(&self) -> Vec<SecurityLogEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: SecurityLogEntry) -> Result<(), AuditStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditStoreError::Unavailable("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }

    async fn query(&self, query: &LogQuery) -> Result<Vec<SecurityLogEntry>, AuditStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditStoreError::Unavailable("lock poisoned".to_string()))?;

        let mut matched: Vec<SecurityLogEntry> = entries
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn count(&self, query: &LogQuery) -> Result<u64, AuditStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(entries.iter().filter(|entry| query.matches(entry)).count() as u64)
    }
}
