use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::SubjectId;

/// Category of a security event.
///
/// The four wire values are a compatibility surface for downstream log
/// consumers and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "AUTHENTICATION")]
    Authentication,
    #[serde(rename = "AUTHORIZATION")]
    Authorization,
    #[serde(rename = "DATA_VALIDATION")]
    DataValidation,
    #[serde(rename = "SECURITY_EVENT")]
    SecurityEvent,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Authentication => "AUTHENTICATION",
            EventCategory::Authorization => "AUTHORIZATION",
            EventCategory::DataValidation => "DATA_VALIDATION",
            EventCategory::SecurityEvent => "SECURITY_EVENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTHENTICATION" => Some(EventCategory::Authentication),
            "AUTHORIZATION" => Some(EventCategory::Authorization),
            "DATA_VALIDATION" => Some(EventCategory::DataValidation),
            "SECURITY_EVENT" => Some(EventCategory::SecurityEvent),
            _ => None,
        }
    }
}

impl core::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Metadata value restricted to serializable primitives.
///
/// Audit metadata is inherently heterogeneous, but the durable sink must
/// always be able to persist an entry, so structured values are excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Int(value as i64)
    }
}

/// Open key-value metadata map (stable iteration order).
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Request facts attached to every entry built from an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub subject: Option<SubjectId>,
    pub ip_address: String,
    pub user_agent: String,
    pub endpoint: String,
    pub method: String,
}

impl RequestInfo {
    /// Request info for events originating inside the process (e.g. the
    /// logging subsystem reporting on itself).
    pub fn internal(endpoint: impl Into<String>) -> Self {
        Self {
            subject: None,
            ip_address: "internal".to_string(),
            user_agent: "tradepost".to_string(),
            endpoint: endpoint.into(),
            method: "INTERNAL".to_string(),
        }
    }
}

/// One immutable security event.
///
/// Field names are a compatibility surface for downstream consumers; the
/// camelCase wire form must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub category: EventCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    pub ip_address: String,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub severity: Severity,
    pub description: String,
    pub endpoint: String,
    pub method: String,
    pub metadata: Metadata,
}

impl SecurityLogEntry {
    /// Build an entry from request facts; `timestamp` is stamped now.
    pub fn from_request(
        req: &RequestInfo,
        event_type: impl Into<String>,
        category: EventCategory,
        severity: Severity,
        success: Option<bool>,
        description: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            category,
            subject_id: req.subject,
            ip_address: req.ip_address.clone(),
            user_agent: req.user_agent.clone(),
            success,
            severity,
            description: description.into(),
            endpoint: req.endpoint.clone(),
            method: req.method.clone(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_stable() {
        let req = RequestInfo {
            subject: Some(SubjectId::new()),
            ip_address: "203.0.113.9".to_string(),
            user_agent: "curl/8".to_string(),
            endpoint: "/change-password".to_string(),
            method: "POST".to_string(),
        };
        let entry = SecurityLogEntry::from_request(
            &req,
            "authentication.failure",
            EventCategory::Authentication,
            Severity::Medium,
            Some(false),
            "invalid token",
            Metadata::from([("code".to_string(), MetadataValue::from("INVALID_TOKEN"))]),
        );

        let json = serde_json::to_value(&entry).unwrap();
        for field in [
            "timestamp",
            "eventType",
            "category",
            "subjectId",
            "ipAddress",
            "userAgent",
            "success",
            "severity",
            "description",
            "endpoint",
            "method",
            "metadata",
        ] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(json["category"], "AUTHENTICATION");
        assert_eq!(json["severity"], "medium");
    }

    #[test]
    fn category_wire_values_round_trip() {
        for (cat, wire) in [
            (EventCategory::Authentication, "\"AUTHENTICATION\""),
            (EventCategory::Authorization, "\"AUTHORIZATION\""),
            (EventCategory::DataValidation, "\"DATA_VALIDATION\""),
            (EventCategory::SecurityEvent, "\"SECURITY_EVENT\""),
        ] {
            assert_eq!(serde_json::to_string(&cat).unwrap(), wire);
            assert_eq!(EventCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(EventCategory::parse("BOGUS"), None);
    }

    #[test]
    fn metadata_values_serialize_as_bare_primitives() {
        let metadata = Metadata::from([
            ("attempts".to_string(), MetadataValue::from(3usize)),
            ("flagged".to_string(), MetadataValue::from(true)),
            ("detail".to_string(), MetadataValue::from("timeout")),
        ]);
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["attempts"], 3);
        assert_eq!(json["flagged"], true);
        assert_eq!(json["detail"], "timeout");
    }
}
