//! `tradepost-audit` — append-only security event pipeline.
//!
//! Every security-relevant outcome becomes one [`SecurityLogEntry`], written
//! to two sinks: the local structured log (always attempted, synchronous,
//! best-effort) and a durable queryable store. Entries are written once,
//! never mutated, never deleted by the application; they are the sole basis
//! for audit queries.

pub mod entry;
pub mod logger;
pub mod query;
pub mod store;

pub use entry::{EventCategory, Metadata, MetadataValue, RequestInfo, SecurityLogEntry, Severity};
pub use logger::{AuditLoggerConfig, AuditQueryError, RoleDirectory, SecurityAuditLogger};
pub use query::{LogQuery, LogStats};
pub use store::{AuditStore, AuditStoreError};
