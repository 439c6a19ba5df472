//! Read-side filters and statistics for the admin audit path.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::{EventCategory, SecurityLogEntry};

/// Filter criteria for audit queries.
///
/// `limit` is clamped by the logger to its configured maximum and applied
/// server-side by the store, never display-side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub category: Option<EventCategory>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn matches(&self, entry: &SecurityLogEntry) -> bool {
        if let Some(category) = self.category {
            if entry.category != category {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Last-24h counts served by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub auth_events: u64,
    pub access_control_failures: u64,
    pub validation_failures: u64,
    pub period: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Metadata, RequestInfo, Severity};
    use chrono::Duration;

    fn entry_at(ts: DateTime<Utc>, category: EventCategory) -> SecurityLogEntry {
        let mut e = SecurityLogEntry::from_request(
            &RequestInfo::internal("test"),
            "test.event",
            category,
            Severity::Low,
            None,
            "test",
            Metadata::new(),
        );
        e.timestamp = ts;
        e
    }

    #[test]
    fn filters_compose() {
        let now = Utc::now();
        let q = LogQuery {
            category: Some(EventCategory::Authentication),
            start: Some(now - Duration::hours(1)),
            end: Some(now),
            limit: None,
        };

        assert!(q.matches(&entry_at(now - Duration::minutes(30), EventCategory::Authentication)));
        assert!(!q.matches(&entry_at(now - Duration::minutes(30), EventCategory::Authorization)));
        assert!(!q.matches(&entry_at(now - Duration::hours(2), EventCategory::Authentication)));
        assert!(!q.matches(&entry_at(now + Duration::minutes(1), EventCategory::Authentication)));
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = LogQuery::default();
        assert!(q.matches(&entry_at(Utc::now(), EventCategory::SecurityEvent)));
    }
}
