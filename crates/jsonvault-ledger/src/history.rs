//! Append-only history recorder.
//!
//! Every mutation of an entry appends one [`HistoryRecord`]. Records are
//! never updated and never deleted individually; they disappear only when
//! the storage layer cascades the deletion of their entry.

use std::any::type_name;
use std::sync::Arc;

use jsonvault_diff::ChangeSet;
use jsonvault_store::{NewHistoryRecord, Storage};
use jsonvault_types::{temporal, EntryId, HistoryAction, HistoryId, HistoryRecord, PageRequest};
use serde::Serialize;
use serde_json::json;

use crate::error::{LedgerError, LedgerResult};

/// Serialize a history payload, substituting a placeholder on failure.
///
/// The placeholder is `{"error", "valueType", "timestamp"}`, so the audit row
/// is still written and still valid JSON.
pub fn safe_json_string<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(text) => text,
        Err(err) => {
            let value_type = type_name::<T>();
            tracing::warn!(error = %err, value_type, "history payload not serializable, storing placeholder");
            json!({
                "error": format!("Failed to serialize: {err}"),
                "valueType": value_type,
                "timestamp": temporal::now().to_rfc3339(),
            })
            .to_string()
        }
    }
}

/// A history row to append, shaped by its action.
///
/// The constructors are the only way to build a draft, which keeps the
/// payload invariants: CREATE carries only the after-document, DELETE only
/// the before-document, UPDATE carries both plus the change set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryDraft {
    entry_id: EntryId,
    action: HistoryAction,
    before: Option<String>,
    after: Option<String>,
    changes: Option<String>,
}

impl HistoryDraft {
    pub fn created<T: Serialize + ?Sized>(entry_id: EntryId, after: &T) -> Self {
        Self {
            entry_id,
            action: HistoryAction::Create,
            before: None,
            after: Some(safe_json_string(after)),
            changes: None,
        }
    }

    pub fn updated<B, A>(entry_id: EntryId, before: &B, after: &A, changes: &ChangeSet) -> Self
    where
        B: Serialize + ?Sized,
        A: Serialize + ?Sized,
    {
        Self {
            entry_id,
            action: HistoryAction::Update,
            before: Some(safe_json_string(before)),
            after: Some(safe_json_string(after)),
            changes: Some(safe_json_string(changes)),
        }
    }

    pub fn deleted<T: Serialize + ?Sized>(entry_id: EntryId, before: &T) -> Self {
        Self {
            entry_id,
            action: HistoryAction::Delete,
            before: Some(safe_json_string(before)),
            after: None,
            changes: None,
        }
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn action(&self) -> HistoryAction {
        self.action
    }

    fn into_record(self) -> NewHistoryRecord {
        NewHistoryRecord {
            entry_id: self.entry_id,
            action: self.action,
            before_json: self.before,
            after_json: self.after,
            changes_json: self.changes,
        }
    }
}

/// Appends and queries the audit trail.
#[derive(Clone)]
pub struct HistoryRecorder {
    storage: Arc<dyn Storage>,
}

impl HistoryRecorder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Append one record. Whether `entry_id` exists is left to the storage
    /// layer's referential check.
    pub fn append(&self, draft: HistoryDraft) -> LedgerResult<HistoryRecord> {
        let record = self.storage.insert_history(&draft.into_record())?;
        tracing::debug!(
            history_id = %record.id,
            entry_id = %record.entry_id,
            action = %record.action,
            "history appended"
        );
        Ok(record)
    }

    /// History of one entry, newest first. Unknown entries yield an empty
    /// list rather than an error.
    pub fn list_by_entry(
        &self,
        entry_id: EntryId,
        page: PageRequest,
    ) -> LedgerResult<Vec<HistoryRecord>> {
        Ok(self.storage.list_history_for_entry(entry_id, page)?)
    }

    /// History across all entries, newest first, each annotated with the
    /// owning entry's current name.
    pub fn list_all(&self, page: PageRequest) -> LedgerResult<Vec<HistoryRecord>> {
        Ok(self.storage.list_history(page)?)
    }

    pub fn get(&self, id: HistoryId) -> LedgerResult<HistoryRecord> {
        self.storage
            .read_history(id)?
            .ok_or(LedgerError::HistoryNotFound(id))
    }
}

impl std::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRecorder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonvault_store::{InMemoryStorage, StoreError};
    use serde::ser::Error as _;
    use serde::Serializer;
    use serde_json::Value;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic reference"))
        }
    }

    fn recorder_with_entry() -> (HistoryRecorder, Arc<InMemoryStorage>, EntryId) {
        let storage = Arc::new(InMemoryStorage::new());
        let id = storage.insert_entry(Some("doc"), &json!({"a": 1})).unwrap();
        (HistoryRecorder::new(storage.clone()), storage, id)
    }

    #[test]
    fn safe_string_passes_through_valid_values() {
        assert_eq!(safe_json_string(&json!({"k": [1, 2]})), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn safe_string_substitutes_placeholder() {
        let text = safe_json_string(&Unserializable);
        let placeholder: Value = serde_json::from_str(&text).unwrap();
        assert!(placeholder["error"].as_str().unwrap().contains("cyclic reference"));
        assert!(placeholder["valueType"].as_str().unwrap().ends_with("Unserializable"));
        assert!(placeholder["timestamp"].is_string());
    }

    #[test]
    fn drafts_respect_payload_shape() {
        let id = EntryId::new(1);
        let created = HistoryDraft::created(id, &json!(1));
        assert_eq!(created.action(), HistoryAction::Create);
        assert!(created.before.is_none() && created.after.is_some() && created.changes.is_none());

        let deleted = HistoryDraft::deleted(id, &json!(1));
        assert_eq!(deleted.action(), HistoryAction::Delete);
        assert!(deleted.before.is_some() && deleted.after.is_none() && deleted.changes.is_none());

        let updated = HistoryDraft::updated(id, &json!(1), &json!(2), &ChangeSet::new());
        assert_eq!(updated.action(), HistoryAction::Update);
        assert!(updated.before.is_some() && updated.after.is_some() && updated.changes.is_some());
        assert_eq!(updated.entry_id(), id);
    }

    #[test]
    fn append_unserializable_payload_still_records() {
        let (recorder, storage, id) = recorder_with_entry();
        let record = recorder
            .append(HistoryDraft::created(id, &Unserializable))
            .unwrap();

        let after = record.after_document.unwrap();
        assert!(after.get("error").is_some());
        assert!(after.get("valueType").is_some());
        assert_eq!(storage.history_count(), 1);
    }

    #[test]
    fn append_for_missing_entry_fails_in_storage() {
        let (recorder, _, _) = recorder_with_entry();
        let err = recorder
            .append(HistoryDraft::created(EntryId::new(999), &json!({})))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Constraint(_))));
    }

    #[test]
    fn list_by_unknown_entry_is_empty() {
        let (recorder, _, _) = recorder_with_entry();
        let records = recorder
            .list_by_entry(EntryId::new(42), PageRequest::default())
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn list_all_is_joined_and_newest_first() {
        let (recorder, _, id) = recorder_with_entry();
        let first = recorder.append(HistoryDraft::created(id, &json!({"a": 1}))).unwrap();
        let second = recorder
            .append(HistoryDraft::deleted(id, &json!({"a": 1})))
            .unwrap();

        let all = recorder.list_all(PageRequest::default()).unwrap();
        assert_eq!(
            all.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(all.iter().all(|r| r.entry_name.as_deref() == Some("doc")));
    }

    #[test]
    fn get_unknown_record() {
        let (recorder, _, id) = recorder_with_entry();
        let record = recorder.append(HistoryDraft::created(id, &json!({}))).unwrap();
        assert_eq!(recorder.get(record.id).unwrap().entry_name.as_deref(), Some("doc"));
        assert!(matches!(
            recorder.get(HistoryId::new(77)),
            Err(LedgerError::HistoryNotFound(_))
        ));
    }
}
