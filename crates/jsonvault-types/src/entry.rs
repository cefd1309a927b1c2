use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::EntryId;

/// Canonical current state of a stored JSON document.
///
/// `document` is always parsed JSON; storage backends decode the persisted
/// text before handing an `Entry` out. On the wire the document is exposed
/// under the `data` key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub name: Option<String>,
    #[serde(rename = "data")]
    pub document: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_serialized_as_data() {
        let ts = DateTime::from_timestamp_millis(0).unwrap();
        let entry = Entry {
            id: EntryId::new(1),
            name: Some("cfg".into()),
            document: json!({"debug": true}),
            created_at: ts,
            updated_at: ts,
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["data"], json!({"debug": true}));
        assert_eq!(v["id"], json!(1));
        assert!(v.get("document").is_none());
    }
}
