use jsonvault_types::{Entry, EntryId, HistoryAction, HistoryId, HistoryRecord, PageRequest};
use serde_json::Value;

use crate::error::StoreResult;

/// A history row ready to be appended.
///
/// Payload columns carry JSON text that has already been serialized by the
/// caller; the store persists them verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewHistoryRecord {
    pub entry_id: EntryId,
    pub action: HistoryAction,
    pub before_json: Option<String>,
    pub after_json: Option<String>,
    pub changes_json: Option<String>,
}

/// Relational storage for entries and their history.
///
/// All implementations must satisfy these invariants:
/// - Entry ids are assigned by the store and never reused.
/// - Deleting an entry removes every history row that references it.
/// - Appending history for an entry that does not exist fails with
///   [`StoreError::Constraint`](crate::StoreError::Constraint).
/// - List operations order by creation time, newest first, ties broken by id.
/// - Every call is independent: no call holds a connection after it returns.
pub trait Storage: Send + Sync {
    /// Insert a new entry and return its assigned id.
    fn insert_entry(&self, name: Option<&str>, document: &Value) -> StoreResult<EntryId>;

    /// Read an entry. Returns `Ok(None)` if it does not exist.
    fn read_entry(&self, id: EntryId) -> StoreResult<Option<Entry>>;

    fn list_entries(&self, page: PageRequest) -> StoreResult<Vec<Entry>>;

    /// Replace an entry's document (and name, when given) and refresh its
    /// `updated_at`. Returns `false` if no entry matched.
    fn update_entry(&self, id: EntryId, name: Option<&str>, document: &Value)
        -> StoreResult<bool>;

    /// Delete an entry and cascade to its history. Returns `false` if no
    /// entry matched.
    fn delete_entry(&self, id: EntryId) -> StoreResult<bool>;

    /// Append a history row and return it as persisted.
    fn insert_history(&self, record: &NewHistoryRecord) -> StoreResult<HistoryRecord>;

    /// History for a single entry, without the joined entry name.
    fn list_history_for_entry(
        &self,
        entry_id: EntryId,
        page: PageRequest,
    ) -> StoreResult<Vec<HistoryRecord>>;

    /// History across all entries, each joined with its entry's current name.
    fn list_history(&self, page: PageRequest) -> StoreResult<Vec<HistoryRecord>>;

    /// A single history row joined with its entry's current name.
    fn read_history(&self, id: HistoryId) -> StoreResult<Option<HistoryRecord>>;

    /// Cheap liveness probe.
    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
