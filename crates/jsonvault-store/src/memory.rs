use std::collections::BTreeMap;

use jsonvault_types::{temporal, Entry, EntryId, HistoryId, HistoryRecord, PageRequest};
use parking_lot::RwLock;
use serde_json::Value;

use crate::codec::decode_column;
use crate::error::{StoreError, StoreResult};
use crate::traits::{NewHistoryRecord, Storage};

/// In-memory storage with the same referential rules as the SQLite tables.
///
/// Intended for tests and embedding. History rows reference their entry and
/// are removed with it; appending history for a missing entry fails with
/// [`StoreError::Constraint`].
pub struct InMemoryStorage {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<EntryId, Entry>,
    history: BTreeMap<HistoryId, HistoryRecord>,
    last_entry_id: i64,
    last_history_id: i64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
        }
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Number of history rows currently stored, across all entries.
    pub fn history_count(&self) -> usize {
        self.inner.read().history.len()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl Storage for InMemoryStorage {
    fn insert_entry(&self, name: Option<&str>, document: &Value) -> StoreResult<EntryId> {
        let now = temporal::now();
        let mut state = self.inner.write();
        state.last_entry_id += 1;
        let id = EntryId::new(state.last_entry_id);
        state.entries.insert(
            id,
            Entry {
                id,
                name: name.map(str::to_string),
                document: document.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn read_entry(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        Ok(self.inner.read().entries.get(&id).cloned())
    }

    fn list_entries(&self, page: PageRequest) -> StoreResult<Vec<Entry>> {
        let mut entries: Vec<Entry> = self.inner.read().entries.values().cloned().collect();
        newest_first(&mut entries, |e| (e.created_at, e.id.get()));
        Ok(page.slice(entries))
    }

    fn update_entry(
        &self,
        id: EntryId,
        name: Option<&str>,
        document: &Value,
    ) -> StoreResult<bool> {
        let now = temporal::now();
        let mut state = self.inner.write();
        let Some(entry) = state.entries.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = name {
            entry.name = Some(name.to_string());
        }
        entry.document = document.clone();
        entry.updated_at = now;
        Ok(true)
    }

    fn delete_entry(&self, id: EntryId) -> StoreResult<bool> {
        let mut state = self.inner.write();
        if state.entries.remove(&id).is_none() {
            return Ok(false);
        }
        state.history.retain(|_, record| record.entry_id != id);
        Ok(true)
    }

    fn insert_history(&self, record: &NewHistoryRecord) -> StoreResult<HistoryRecord> {
        let now = temporal::now();
        let mut state = self.inner.write();
        if !state.entries.contains_key(&record.entry_id) {
            return Err(StoreError::Constraint(format!(
                "entry {} does not exist",
                record.entry_id
            )));
        }

        let raw_id = state.last_history_id + 1;
        let stored = HistoryRecord {
            id: HistoryId::new(raw_id),
            entry_id: record.entry_id,
            entry_name: None,
            action: record.action,
            before_document: decode_column("history", raw_id, record.before_json.as_deref())?,
            after_document: decode_column("history", raw_id, record.after_json.as_deref())?,
            changes: decode_column("history", raw_id, record.changes_json.as_deref())?,
            created_at: now,
        };
        state.last_history_id = raw_id;
        state.history.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn list_history_for_entry(
        &self,
        entry_id: EntryId,
        page: PageRequest,
    ) -> StoreResult<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = self
            .inner
            .read()
            .history
            .values()
            .filter(|r| r.entry_id == entry_id)
            .cloned()
            .collect();
        newest_first(&mut records, |r| (r.created_at, r.id.get()));
        Ok(page.slice(records))
    }

    fn list_history(&self, page: PageRequest) -> StoreResult<Vec<HistoryRecord>> {
        let state = self.inner.read();
        let mut records: Vec<HistoryRecord> = state
            .history
            .values()
            .filter_map(|r| joined(&state, r))
            .collect();
        drop(state);
        newest_first(&mut records, |r| (r.created_at, r.id.get()));
        Ok(page.slice(records))
    }

    fn read_history(&self, id: HistoryId) -> StoreResult<Option<HistoryRecord>> {
        let state = self.inner.read();
        Ok(state.history.get(&id).and_then(|r| joined(&state, r)))
    }
}

fn joined(state: &MemoryState, record: &HistoryRecord) -> Option<HistoryRecord> {
    let entry = state.entries.get(&record.entry_id)?;
    Some(HistoryRecord {
        entry_name: entry.name.clone(),
        ..record.clone()
    })
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("InMemoryStorage")
            .field("entry_count", &state.entries.len())
            .field("history_count", &state.history.len())
            .finish()
    }
}
