use async_trait::async_trait;
use thiserror::Error;

use crate::entry::SecurityLogEntry;
use crate::query::LogQuery;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Durable, append-only destination for security log entries.
///
/// Safe under concurrent writers; no ordering requirement stronger than
/// "eventually visible". Retention/rotation is an operational concern of the
/// implementation, never the application's.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: SecurityLogEntry) -> Result<(), AuditStoreError>;

    /// Matching entries, newest-first; `query.limit` applied server-side.
    async fn query(&self, query: &LogQuery) -> Result<Vec<SecurityLogEntry>, AuditStoreError>;

    /// Count of matching entries, ignoring `query.limit`.
    async fn count(&self, query: &LogQuery) -> Result<u64, AuditStoreError>;
}
