//! JSON column encoding.

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

pub(crate) fn encode_document(document: &Value) -> StoreResult<String> {
    serde_json::to_string(document).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn decode_column(
    table: &'static str,
    id: i64,
    text: Option<&str>,
) -> StoreResult<Option<Value>> {
    text.map(|text| decode_document(table, id, text)).transpose()
}

pub(crate) fn decode_document(table: &'static str, id: i64, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text).map_err(|e| StoreError::CorruptRow {
        table,
        id,
        reason: e.to_string(),
    })
}
