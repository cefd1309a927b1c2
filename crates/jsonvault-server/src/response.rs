//! JSON response envelopes.

use chrono::{DateTime, SecondsFormat, Utc};
use jsonvault_types::PageRequest;
use serde::Serialize;

/// `{success, message?, data, pagination?}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn with_message(message: &'static str, data: T) -> Self {
        Self {
            message: Some(message),
            ..Self::data(data)
        }
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// A list response. `total` is the number of items returned, and the
    /// echoed limit and offset are the clamped values actually applied.
    pub fn page(items: Vec<T>, page: PageRequest) -> Self {
        let pagination = Pagination {
            limit: page.limit(),
            offset: page.offset(),
            total: items.len(),
        };
        Self {
            pagination: Some(pagination),
            ..Self::data(items)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

impl HealthStatus {
    pub const MESSAGE: &'static str = "jsonvault API is running";

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: Self::MESSAGE,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_envelope_omits_optional_fields() {
        let v = serde_json::to_value(Envelope::data(json!({"id": 1}))).unwrap();
        assert_eq!(v, json!({"success": true, "data": {"id": 1}}));
    }

    #[test]
    fn page_envelope_counts_returned_items() {
        let env = Envelope::page(vec![1, 2, 3], PageRequest::new(500, -3));
        let v = serde_json::to_value(env).unwrap();
        assert_eq!(v["pagination"], json!({"limit": 100, "offset": 0, "total": 3}));
    }

    #[test]
    fn health_timestamp_is_utc() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let health = HealthStatus::at(now);
        assert_eq!(health.timestamp, "2023-11-14T22:13:20.123Z");
    }
}
