//! Audit record for a single handled request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
    /// Request path
    pub endpoint: String,
    /// Query parameters as a JSON object
    pub params: String,
    /// Response body as sent to the caller
    pub response_body: String,
    pub http_status: u16,
    /// `true` for 2xx responses
    pub success: bool,
    /// Message extracted from an error body, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl HistoryRecord {
    /// Creates a record stamped with the current time and a fresh id.
    pub fn new(
        endpoint: impl Into<String>,
        params: impl Into<String>,
        response_body: impl Into<String>,
        http_status: u16,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            params: params.into(),
            response_body: response_body.into(),
            http_status,
            success: (200..300).contains(&http_status),
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_follows_status() {
        assert!(HistoryRecord::new("/api", "{}", "{}", 200, None).success);
        assert!(HistoryRecord::new("/api", "{}", "{}", 204, None).success);
        assert!(!HistoryRecord::new("/api", "{}", "{}", 400, Some("bad".into())).success);
        assert!(!HistoryRecord::new("/api", "{}", "{}", 503, None).success);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = HistoryRecord::new("/api", "{}", "{}", 200, None);
        let b = HistoryRecord::new("/api", "{}", "{}", 200, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serialize_omits_absent_error_message() {
        let record = HistoryRecord::new("/api/v1/history", "{}", "[]", 200, None);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["endpoint"], "/api/v1/history");
        assert_eq!(json["http_status"], 200);
        assert!(json.get("error_message").is_none());
    }
}
