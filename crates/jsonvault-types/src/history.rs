use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::ids::{EntryId, HistoryId};

/// Kind of mutation captured by a history record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    /// Entry was created; only the after-document is recorded.
    Create,
    /// Entry was replaced; before, after, and the change set are recorded.
    Update,
    /// Entry was deleted; only the before-document is recorded.
    Delete,
}

impl HistoryAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(TypeError::UnknownAction(other.to_string())),
        }
    }
}

/// One row of the append-only audit trail.
///
/// `entry_name` is only populated by queries that join against the owning
/// entry; it is never stored on the record itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub entry_id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
    pub action: HistoryAction,
    #[serde(rename = "old_data")]
    pub before_document: Option<Value>,
    #[serde(rename = "new_data")]
    pub after_document: Option<Value>,
    pub changes: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_string_roundtrip() {
        for action in [HistoryAction::Create, HistoryAction::Update, HistoryAction::Delete] {
            assert_eq!(action.as_str().parse::<HistoryAction>().unwrap(), action);
        }
        assert!("RENAME".parse::<HistoryAction>().is_err());
    }

    #[test]
    fn action_serializes_uppercase() {
        assert_eq!(serde_json::to_value(HistoryAction::Delete).unwrap(), json!("DELETE"));
    }

    #[test]
    fn record_wire_names() {
        let record = HistoryRecord {
            id: HistoryId::new(4),
            entry_id: EntryId::new(2),
            entry_name: None,
            action: HistoryAction::Create,
            before_document: None,
            after_document: Some(json!({"a": 1})),
            changes: None,
            created_at: DateTime::from_timestamp_millis(0).unwrap(),
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["new_data"], json!({"a": 1}));
        assert_eq!(v["old_data"], Value::Null);
        assert_eq!(v["action"], json!("CREATE"));
        assert!(v.get("entry_name").is_none());
    }
}
