use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use thiserror::Error;

use tradepost_core::SubjectId;

use crate::entry::{
    EventCategory, Metadata, MetadataValue, RequestInfo, SecurityLogEntry, Severity,
};
use crate::query::{LogQuery, LogStats};
use crate::store::AuditStore;

/// Role lookup for admin re-verification at query time.
///
/// Fail-closed: an unknown subject is not an admin.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn is_admin(&self, subject: &SubjectId) -> bool;
}

#[derive(Debug, Clone)]
pub struct AuditLoggerConfig {
    /// Bound on how long a caller waits for the durable sink.
    pub durable_write_timeout: Duration,
    /// Delay before the out-of-band retry of a failed durable write.
    pub retry_delay: Duration,
    /// Server-side cap on query result size.
    pub max_query_limit: usize,
    /// Result size when the caller supplies no limit.
    pub default_query_limit: usize,
}

impl Default for AuditLoggerConfig {
    fn default() -> Self {
        Self {
            durable_write_timeout: Duration::from_secs(2),
            retry_delay: Duration::from_millis(250),
            max_query_limit: 500,
            default_query_limit: 100,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditQueryError {
    /// The requester is not an administrator (re-verified at query time).
    #[error("access denied")]
    AccessDenied,

    #[error("audit store unavailable")]
    Unavailable(String),
}

/// Append-only security event pipeline with dual-sink delivery.
///
/// The local structured log is written first, synchronously, best-effort.
/// The durable store is attempted second under a bounded timeout; a failure
/// there is logged locally, retried once out-of-band, and on repeated
/// failure escalated as a high-severity SECURITY_EVENT against the logging
/// subsystem itself. A sink failure never aborts the primary request flow.
pub struct SecurityAuditLogger {
    store: Arc<dyn AuditStore>,
    directory: Arc<dyn RoleDirectory>,
    config: AuditLoggerConfig,
}

impl SecurityAuditLogger {
    pub fn new(
        store: Arc<dyn AuditStore>,
        directory: Arc<dyn RoleDirectory>,
        config: AuditLoggerConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Record an authentication attempt (success or failure).
    pub async fn auth_attempt(
        &self,
        req: &RequestInfo,
        success: bool,
        description: impl Into<String>,
        metadata: Metadata,
    ) {
        let severity = if success {
            Severity::Low
        } else {
            Severity::Medium
        };
        let event_type = if success {
            "authentication.success"
        } else {
            "authentication.failure"
        };
        self.append(SecurityLogEntry::from_request(
            req,
            event_type,
            EventCategory::Authentication,
            severity,
            Some(success),
            description,
            metadata,
        ))
        .await;
    }

    /// Record an authorization denial.
    pub async fn access_control_failure(
        &self,
        req: &RequestInfo,
        description: impl Into<String>,
        metadata: Metadata,
    ) {
        self.append(SecurityLogEntry::from_request(
            req,
            "authorization.denied",
            EventCategory::Authorization,
            Severity::Medium,
            Some(false),
            description,
            metadata,
        ))
        .await;
    }

    /// Record rejected input (e.g. a candidate password failing policy).
    pub async fn validation_failure(
        &self,
        req: &RequestInfo,
        description: impl Into<String>,
        metadata: Metadata,
    ) {
        self.append(SecurityLogEntry::from_request(
            req,
            "validation.failed",
            EventCategory::DataValidation,
            Severity::Low,
            Some(false),
            description,
            metadata,
        ))
        .await;
    }

    /// Record a general security event.
    pub async fn security_event(
        &self,
        req: &RequestInfo,
        event_type: impl Into<String>,
        severity: Severity,
        success: Option<bool>,
        description: impl Into<String>,
        metadata: Metadata,
    ) {
        self.append(SecurityLogEntry::from_request(
            req,
            event_type,
            EventCategory::SecurityEvent,
            severity,
            success,
            description,
            metadata,
        ))
        .await;
    }

    /// Admin read path over the durable store.
    ///
    /// The requester's admin role is re-verified here, not trusted from an
    /// earlier token check. Every successful read appends its own
    /// SECURITY_EVENT entry: the audit trail records its own inspection.
    pub async fn query(
        &self,
        req: &RequestInfo,
        requesting_admin: SubjectId,
        mut query: LogQuery,
    ) -> Result<Vec<SecurityLogEntry>, AuditQueryError> {
        if !self.directory.is_admin(&requesting_admin).await {
            return Err(AuditQueryError::AccessDenied);
        }

        let limit = query
            .limit
            .unwrap_or(self.config.default_query_limit)
            .min(self.config.max_query_limit);
        query.limit = Some(limit);

        let logs = self
            .store
            .query(&query)
            .await
            .map_err(|e| AuditQueryError::Unavailable(e.to_string()))?;

        let mut metadata = Metadata::new();
        metadata.insert("resultCount".to_string(), MetadataValue::from(logs.len()));
        if let Some(category) = query.category {
            metadata.insert(
                "categoryFilter".to_string(),
                MetadataValue::from(category.as_str()),
            );
        }
        self.security_event(
            req,
            "audit.log_accessed",
            Severity::Low,
            Some(true),
            "admin accessed audit log",
            metadata,
        )
        .await;

        Ok(logs)
    }

    /// Last-24h counts for the stats endpoint (admin re-verified).
    pub async fn stats(
        &self,
        req: &RequestInfo,
        requesting_admin: SubjectId,
    ) -> Result<LogStats, AuditQueryError> {
        if !self.directory.is_admin(&requesting_admin).await {
            return Err(AuditQueryError::AccessDenied);
        }

        let since = Utc::now() - ChronoDuration::hours(24);
        let count_for = |category| {
            let store = self.store.clone();
            let query = LogQuery {
                category: Some(category),
                start: Some(since),
                ..LogQuery::default()
            };
            async move { store.count(&query).await }
        };

        let auth_events = count_for(EventCategory::Authentication)
            .await
            .map_err(|e| AuditQueryError::Unavailable(e.to_string()))?;
        let access_control_failures = count_for(EventCategory::Authorization)
            .await
            .map_err(|e| AuditQueryError::Unavailable(e.to_string()))?;
        let validation_failures = count_for(EventCategory::DataValidation)
            .await
            .map_err(|e| AuditQueryError::Unavailable(e.to_string()))?;

        self.security_event(
            req,
            "audit.log_accessed",
            Severity::Low,
            Some(true),
            "admin accessed audit statistics",
            Metadata::new(),
        )
        .await;

        Ok(LogStats {
            auth_events,
            access_control_failures,
            validation_failures,
            period: "last24h",
        })
    }

    /// Dual-sink append. Never returns an error: each entry is evidence for
    /// a specific request, and audit logging must not abort that request.
    async fn append(&self, entry: SecurityLogEntry) {
        log_local(&entry);

        let write = self.store.append(entry.clone());
        match tokio::time::timeout(self.config.durable_write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, event_type = %entry.event_type, "durable audit write failed; local record is authoritative");
                self.retry_out_of_band(entry);
            }
            Err(_) => {
                tracing::warn!(event_type = %entry.event_type, "durable audit write timed out; local record is authoritative");
                self.retry_out_of_band(entry);
            }
        }
    }

    fn retry_out_of_band(&self, entry: SecurityLogEntry) {
        let store = self.store.clone();
        let delay = self.config.retry_delay;
        let write_timeout = self.config.durable_write_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let retried = tokio::time::timeout(write_timeout, store.append(entry.clone())).await;
            if matches!(retried, Ok(Ok(()))) {
                return;
            }

            // Repeated failure: escalate against the logging subsystem.
            let mut metadata = Metadata::new();
            metadata.insert(
                "originalEventType".to_string(),
                MetadataValue::from(entry.event_type.as_str()),
            );
            metadata.insert(
                "originalCategory".to_string(),
                MetadataValue::from(entry.category.as_str()),
            );
            let escalation = SecurityLogEntry::from_request(
                &RequestInfo::internal("audit:durable-sink"),
                "audit.sink_failure",
                EventCategory::SecurityEvent,
                Severity::High,
                Some(false),
                "durable audit sink rejected an entry after retry",
                metadata,
            );
            log_local(&escalation);
            let _ = tokio::time::timeout(write_timeout, store.append(escalation)).await;
        });
    }
}

/// Local structured sink: one tracing event per entry, JSON payload included
/// so the line is self-contained evidence even if the durable write is lost.
fn log_local(entry: &SecurityLogEntry) {
    let payload = serde_json::to_string(entry).unwrap_or_else(|e| format!("{{\"serializeError\":\"{e}\"}}"));
    match entry.severity {
        Severity::Low => tracing::info!(
            target: "security_audit",
            category = entry.category.as_str(),
            event_type = %entry.event_type,
            entry = %payload,
            "security event"
        ),
        Severity::Medium | Severity::High => tracing::warn!(
            target: "security_audit",
            category = entry.category.as_str(),
            event_type = %entry.event_type,
            entry = %payload,
            "security event"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AuditStoreError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemStore {
        entries: Mutex<Vec<SecurityLogEntry>>,
    }

    #[async_trait]
    impl AuditStore for MemStore {
        async fn append(&self, entry: SecurityLogEntry) -> Result<(), AuditStoreError> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        async fn query(&self, query: &LogQuery) -> Result<Vec<SecurityLogEntry>, AuditStoreError> {
            let entries = self.entries.lock().unwrap();
            let mut matched: Vec<_> = entries.iter().filter(|e| query.matches(e)).cloned().collect();
            matched.reverse();
            if let Some(limit) = query.limit {
                matched.truncate(limit);
            }
            Ok(matched)
        }

        async fn count(&self, query: &LogQuery) -> Result<u64, AuditStoreError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries.iter().filter(|e| query.matches(e)).count() as u64)
        }
    }

    /// Fails the first `failures` appends, then succeeds.
    struct FlakyStore {
        inner: MemStore,
        failures: AtomicUsize,
    }

    impl FlakyStore {
        fn failing(failures: usize) -> Self {
            Self {
                inner: MemStore::default(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl AuditStore for FlakyStore {
        async fn append(&self, entry: SecurityLogEntry) -> Result<(), AuditStoreError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AuditStoreError::Unavailable("injected".to_string()));
            }
            self.inner.append(entry).await
        }

        async fn query(&self, query: &LogQuery) -> Result<Vec<SecurityLogEntry>, AuditStoreError> {
            self.inner.query(query).await
        }

        async fn count(&self, query: &LogQuery) -> Result<u64, AuditStoreError> {
            self.inner.count(query).await
        }
    }

    struct FixedDirectory {
        admin: SubjectId,
    }

    #[async_trait]
    impl RoleDirectory for FixedDirectory {
        async fn is_admin(&self, subject: &SubjectId) -> bool {
            *subject == self.admin
        }
    }

    fn request(subject: Option<SubjectId>) -> RequestInfo {
        RequestInfo {
            subject,
            ip_address: "203.0.113.9".to_string(),
            user_agent: "test-agent".to_string(),
            endpoint: "/security-logs".to_string(),
            method: "GET".to_string(),
        }
    }

    fn logger_with(store: Arc<dyn AuditStore>, admin: SubjectId) -> SecurityAuditLogger {
        SecurityAuditLogger::new(
            store,
            Arc::new(FixedDirectory { admin }),
            AuditLoggerConfig {
                retry_delay: Duration::from_millis(10),
                ..AuditLoggerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn append_reaches_the_durable_store() {
        let store = Arc::new(MemStore::default());
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        logger
            .auth_attempt(&request(Some(admin)), false, "bad token", Metadata::new())
            .await;

        let entries = store.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, EventCategory::Authentication);
        assert_eq!(entries[0].success, Some(false));
        assert_eq!(entries[0].endpoint, "/security-logs");
    }

    #[tokio::test]
    async fn non_admin_query_is_denied() {
        let store = Arc::new(MemStore::default());
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        let stranger = SubjectId::new();
        let err = logger
            .query(&request(Some(stranger)), stranger, LogQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err, AuditQueryError::AccessDenied);

        // Denied reads do not mint an access entry.
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_query_records_its_own_inspection() {
        let store = Arc::new(MemStore::default());
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        logger
            .auth_attempt(&request(None), true, "token ok", Metadata::new())
            .await;

        let logs = logger
            .query(&request(Some(admin)), admin, LogQuery::default())
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);

        let entries = store.entries.lock().unwrap();
        let access = entries
            .iter()
            .find(|e| e.event_type == "audit.log_accessed")
            .expect("missing self-inspection entry");
        assert_eq!(access.category, EventCategory::SecurityEvent);
        assert_eq!(access.success, Some(true));
    }

    #[tokio::test]
    async fn query_returns_newest_first_and_honors_the_limit_cap() {
        let store = Arc::new(MemStore::default());
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        for n in 0..5 {
            logger
                .auth_attempt(&request(None), false, format!("attempt {n}"), Metadata::new())
                .await;
        }

        let logs = logger
            .query(
                &request(Some(admin)),
                admin,
                LogQuery {
                    category: Some(EventCategory::Authentication),
                    limit: Some(2),
                    ..LogQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].description, "attempt 4");
        assert_eq!(logs[1].description, "attempt 3");
    }

    #[tokio::test]
    async fn stats_count_the_last_24h_by_category() {
        let store = Arc::new(MemStore::default());
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        logger
            .auth_attempt(&request(None), true, "ok", Metadata::new())
            .await;
        logger
            .auth_attempt(&request(None), false, "bad", Metadata::new())
            .await;
        logger
            .access_control_failure(&request(None), "forbidden", Metadata::new())
            .await;
        logger
            .validation_failure(&request(None), "weak password", Metadata::new())
            .await;

        let stats = logger.stats(&request(Some(admin)), admin).await.unwrap();
        assert_eq!(stats.auth_events, 2);
        assert_eq!(stats.access_control_failures, 1);
        assert_eq!(stats.validation_failures, 1);
        assert_eq!(stats.period, "last24h");
    }

    #[tokio::test]
    async fn failed_durable_write_is_retried_out_of_band() {
        let store = Arc::new(FlakyStore::failing(1));
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        logger
            .auth_attempt(&request(None), false, "bad token", Metadata::new())
            .await;

        // The caller was not blocked on the retry; wait for it to land.
        for _ in 0..50 {
            if !store.inner.entries.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let entries = store.inner.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, "authentication.failure");
    }

    #[tokio::test]
    async fn repeated_sink_failure_escalates_as_high_severity() {
        let store = Arc::new(FlakyStore::failing(2));
        let admin = SubjectId::new();
        let logger = logger_with(store.clone(), admin);

        logger
            .auth_attempt(&request(None), false, "bad token", Metadata::new())
            .await;

        for _ in 0..50 {
            if !store.inner.entries.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let entries = store.inner.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, "audit.sink_failure");
        assert_eq!(entries[0].severity, Severity::High);
        assert_eq!(
            entries[0].metadata.get("originalEventType"),
            Some(&MetadataValue::from("authentication.failure"))
        );
    }
}
