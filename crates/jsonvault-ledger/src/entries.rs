//! The entry store: CRUD over JSON documents with an audit trail.

use std::sync::Arc;

use jsonvault_diff::compute_changes;
use jsonvault_store::Storage;
use jsonvault_types::{temporal, Entry, EntryId, PageRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::history::{HistoryDraft, HistoryRecorder};

/// Confirmation message returned by [`EntryStore::delete`].
pub const DELETED_MESSAGE: &str = "Entry deleted successfully";

/// Input for [`EntryStore::create`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewEntry {
    pub name: Option<String>,
    pub document: Value,
}

impl NewEntry {
    pub fn new(document: Value) -> Self {
        Self {
            name: None,
            document,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build from request fields. A missing or `null` document is rejected.
    pub fn from_request(name: Option<String>, data: Option<Value>) -> LedgerResult<Self> {
        let document = required_document(data, "JSON data is required")?;
        Ok(Self { name, document })
    }
}

/// Input for [`EntryStore::update`]. A `None` or blank name leaves the
/// stored name unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryUpdate {
    pub name: Option<String>,
    pub document: Value,
}

impl EntryUpdate {
    pub fn new(document: Value) -> Self {
        Self {
            name: None,
            document,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from_request(name: Option<String>, data: Option<Value>) -> LedgerResult<Self> {
        let document = required_document(data, "JSON data is required for update")?;
        Ok(Self { name, document })
    }
}

/// Result of a successful delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntry {
    pub message: String,
    #[serde(rename = "deletedId")]
    pub deleted_id: EntryId,
}

fn required_document(data: Option<Value>, message: &str) -> LedgerResult<Value> {
    match data {
        Some(Value::Null) | None => Err(LedgerError::Validation(message.to_string())),
        Some(document) => Ok(document),
    }
}

/// Empty and whitespace-only names count as absent.
fn normalize_name(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.trim().is_empty())
}

/// Owns the canonical current state of every entry and drives the
/// [`HistoryRecorder`] on each mutation.
///
/// Update is a read, a write and an append issued as separate storage
/// calls. Two concurrent updates of the same entry can both observe the same
/// old document; both history rows are kept and the later write wins.
#[derive(Clone)]
pub struct EntryStore {
    storage: Arc<dyn Storage>,
    history: HistoryRecorder,
}

impl EntryStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let history = HistoryRecorder::new(storage.clone());
        Self { storage, history }
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn create(&self, input: NewEntry) -> LedgerResult<Entry> {
        let name = match normalize_name(input.name.as_deref()) {
            Some(name) => name.to_string(),
            None => temporal::generated_entry_name(temporal::now()),
        };

        let id = self.storage.insert_entry(Some(&name), &input.document)?;
        self.history
            .append(HistoryDraft::created(id, &input.document))?;

        let entry = self.storage.read_entry(id)?.ok_or(LedgerError::NotFound(id))?;
        tracing::info!(entry_id = %id, name = %name, "entry created");
        Ok(entry)
    }

    pub fn get(&self, id: EntryId) -> LedgerResult<Entry> {
        tracing::debug!(entry_id = %id, "reading entry");
        self.storage.read_entry(id)?.ok_or(LedgerError::NotFound(id))
    }

    /// Entries newest first.
    pub fn list(&self, page: PageRequest) -> LedgerResult<Vec<Entry>> {
        tracing::debug!(limit = page.limit(), offset = page.offset(), "listing entries");
        Ok(self.storage.list_entries(page)?)
    }

    pub fn update(&self, id: EntryId, input: EntryUpdate) -> LedgerResult<Entry> {
        let before = self.get(id)?;
        let changes = compute_changes(&before.document, &input.document);

        let name = normalize_name(input.name.as_deref());
        if !self.storage.update_entry(id, name, &input.document)? {
            return Err(LedgerError::NotFound(id));
        }
        self.history.append(HistoryDraft::updated(
            id,
            &before.document,
            &input.document,
            &changes,
        ))?;

        let entry = self.get(id)?;
        tracing::info!(
            entry_id = %id,
            added = changes.added.len(),
            removed = changes.removed.len(),
            modified = changes.modified.len(),
            "entry updated"
        );
        Ok(entry)
    }

    /// Append the DELETE record, then remove the entry. Storage cascades the
    /// removal to every history row of the entry, including the one just
    /// appended.
    pub fn delete(&self, id: EntryId) -> LedgerResult<DeletedEntry> {
        let current = self.get(id)?;
        self.history
            .append(HistoryDraft::deleted(id, &current.document))?;

        if !self.storage.delete_entry(id)? {
            return Err(LedgerError::NotFound(id));
        }
        tracing::info!(entry_id = %id, "entry deleted");
        Ok(DeletedEntry {
            message: DELETED_MESSAGE.to_string(),
            deleted_id: id,
        })
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore").finish_non_exhaustive()
    }
}
