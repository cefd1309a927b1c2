use std::fs;

use chrono::{DateTime, Utc};
use jsonvault_types::{
    temporal, Entry, EntryId, HistoryAction, HistoryId, HistoryRecord, PageRequest,
};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

use crate::codec::{decode_column, decode_document, encode_document};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::pool::{ConnectionPool, PoolStatus};
use crate::schema;
use crate::traits::{NewHistoryRecord, Storage};

const ENTRY_COLUMNS: &str = "id, name, document, created_at_ms, updated_at_ms";
const HISTORY_COLUMNS: &str =
    "id, entry_id, NULL AS entry_name, action, before_document, after_document, changes, created_at_ms";
const HISTORY_VIEW_COLUMNS: &str =
    "id, entry_id, entry_name, action, before_document, after_document, changes, created_at_ms";

/// SQLite-backed storage over a bounded [`ConnectionPool`].
///
/// Each trait call checks out one connection for its duration. Calls are not
/// grouped into transactions; callers that sequence several calls see each
/// one commit independently.
#[derive(Debug)]
pub struct SqliteStorage {
    pool: ConnectionPool,
}

impl SqliteStorage {
    /// Prepare the database location and the pool. No connection is opened
    /// until the first operation or [`ping`](Storage::ping).
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            pool: ConnectionPool::new(config)?,
        })
    }

    /// Create tables, indexes, and the history view.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        schema::create_schema(&conn)?;
        tracing::info!(path = %self.pool.path().display(), "schema ready");
        Ok(())
    }

    pub fn schema_present(&self) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        schema::schema_present(&conn)
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }
}

struct EntryRow {
    id: i64,
    name: Option<String>,
    document: String,
    created_at_ms: i64,
    updated_at_ms: i64,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            document: row.get(2)?,
            created_at_ms: row.get(3)?,
            updated_at_ms: row.get(4)?,
        })
    }

    fn into_entry(self) -> StoreResult<Entry> {
        Ok(Entry {
            id: EntryId::new(self.id),
            document: decode_document("entries", self.id, &self.document)?,
            name: self.name,
            created_at: timestamp("entries", self.id, self.created_at_ms)?,
            updated_at: timestamp("entries", self.id, self.updated_at_ms)?,
        })
    }
}

struct HistoryRow {
    id: i64,
    entry_id: i64,
    entry_name: Option<String>,
    action: String,
    before: Option<String>,
    after: Option<String>,
    changes: Option<String>,
    created_at_ms: i64,
}

impl HistoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            entry_name: row.get(2)?,
            action: row.get(3)?,
            before: row.get(4)?,
            after: row.get(5)?,
            changes: row.get(6)?,
            created_at_ms: row.get(7)?,
        })
    }

    fn into_record(self) -> StoreResult<HistoryRecord> {
        let action = self.action.parse::<HistoryAction>().map_err(|e| StoreError::CorruptRow {
            table: "history",
            id: self.id,
            reason: format!("{e}"),
        })?;
        Ok(HistoryRecord {
            id: HistoryId::new(self.id),
            entry_id: EntryId::new(self.entry_id),
            entry_name: self.entry_name,
            action,
            before_document: decode_column("history", self.id, self.before.as_deref())?,
            after_document: decode_column("history", self.id, self.after.as_deref())?,
            changes: decode_column("history", self.id, self.changes.as_deref())?,
            created_at: timestamp("history", self.id, self.created_at_ms)?,
        })
    }
}

fn timestamp(
    table: &'static str,
    id: i64,
    ms: i64,
) -> StoreResult<DateTime<Utc>> {
    temporal::from_millis(ms).map_err(|e| StoreError::CorruptRow {
        table,
        id,
        reason: e.to_string(),
    })
}

fn page_params(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

impl Storage for SqliteStorage {
    fn insert_entry(&self, name: Option<&str>, document: &Value) -> StoreResult<EntryId> {
        let text = encode_document(document)?;
        let now = temporal::now_millis();
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO entries (name, document, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, text, now],
        )?;
        Ok(EntryId::new(conn.last_insert_rowid()))
    }

    fn read_entry(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id.get()],
                EntryRow::from_row,
            )
            .optional()?;
        row.map(EntryRow::into_entry).transpose()
    }

    fn list_entries(&self, page: PageRequest) -> StoreResult<Vec<Entry>> {
        let (limit, offset) = page_params(page);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![limit, offset], EntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    fn update_entry(
        &self,
        id: EntryId,
        name: Option<&str>,
        document: &Value,
    ) -> StoreResult<bool> {
        let text = encode_document(document)?;
        let now = temporal::now_millis();
        let conn = self.pool.get()?;
        let changed = match name {
            Some(name) => conn.execute(
                "UPDATE entries SET name = ?1, document = ?2, updated_at_ms = ?3 WHERE id = ?4",
                params![name, text, now, id.get()],
            )?,
            None => conn.execute(
                "UPDATE entries SET document = ?1, updated_at_ms = ?2 WHERE id = ?3",
                params![text, now, id.get()],
            )?,
        };
        Ok(changed > 0)
    }

    fn delete_entry(&self, id: EntryId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM entries WHERE id = ?1", params![id.get()])?;
        Ok(deleted > 0)
    }

    fn insert_history(&self, record: &NewHistoryRecord) -> StoreResult<HistoryRecord> {
        let now = temporal::now_millis();
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO history
               (entry_id, action, before_document, after_document, changes, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.entry_id.get(),
                record.action.as_str(),
                record.before_json,
                record.after_json,
                record.changes_json,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        HistoryRow {
            id,
            entry_id: record.entry_id.get(),
            entry_name: None,
            action: record.action.as_str().to_string(),
            before: record.before_json.clone(),
            after: record.after_json.clone(),
            changes: record.changes_json.clone(),
            created_at_ms: now,
        }
        .into_record()
    }

    fn list_history_for_entry(
        &self,
        entry_id: EntryId,
        page: PageRequest,
    ) -> StoreResult<Vec<HistoryRecord>> {
        let (limit, offset) = page_params(page);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history
             WHERE entry_id = ?1
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(params![entry_id.get(), limit, offset], HistoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(HistoryRow::into_record).collect()
    }

    fn list_history(&self, page: PageRequest) -> StoreResult<Vec<HistoryRecord>> {
        let (limit, offset) = page_params(page);
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_VIEW_COLUMNS} FROM history_view
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(params![limit, offset], HistoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(HistoryRow::into_record).collect()
    }

    fn read_history(&self, id: HistoryId) -> StoreResult<Option<HistoryRecord>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                &format!("SELECT {HISTORY_VIEW_COLUMNS} FROM history_view WHERE id = ?1"),
                params![id.get()],
                HistoryRow::from_row,
            )
            .optional()?;
        row.map(HistoryRow::into_record).transpose()
    }

    fn ping(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_store(dir: &tempfile::TempDir) -> SqliteStorage {
        let store = SqliteStorage::open(&StoreConfig {
            path: dir.path().join("data").join("vault.db"),
            pool_size: 4,
            busy_timeout_ms: 1_000,
        })
        .unwrap();
        store.init_schema().unwrap();
        store
    }

    fn history(entry_id: EntryId, action: HistoryAction) -> NewHistoryRecord {
        NewHistoryRecord {
            entry_id,
            action,
            before_json: None,
            after_json: Some(r#"{"v":1}"#.into()),
            changes_json: None,
        }
    }

    #[test]
    fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(dir.path().join("data").exists());
        assert!(store.schema_present().unwrap());
        store.ping().unwrap();
    }

    #[test]
    fn entry_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let doc = json!({"z": 1, "a": {"nested": [1, 2, null]}});

        let id = store.insert_entry(Some("cfg"), &doc).unwrap();
        let entry = store.read_entry(id).unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.name.as_deref(), Some("cfg"));
        assert_eq!(entry.document, doc);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn read_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.read_entry(EntryId::new(404)).unwrap().is_none());
    }

    #[test]
    fn update_keeps_name_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = store.insert_entry(Some("keep"), &json!({"a": 1})).unwrap();

        assert!(store.update_entry(id, None, &json!({"a": 2})).unwrap());
        let entry = store.read_entry(id).unwrap().unwrap();
        assert_eq!(entry.name.as_deref(), Some("keep"));
        assert_eq!(entry.document, json!({"a": 2}));

        assert!(store.update_entry(id, Some("renamed"), &json!({"a": 3})).unwrap());
        let entry = store.read_entry(id).unwrap().unwrap();
        assert_eq!(entry.name.as_deref(), Some("renamed"));
        assert!(entry.updated_at >= entry.created_at);

        assert!(!store.update_entry(EntryId::new(999), None, &json!(1)).unwrap());
    }

    #[test]
    fn list_is_newest_first_and_paged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let ids: Vec<EntryId> = (0..5)
            .map(|i| store.insert_entry(None, &json!({"i": i})).unwrap())
            .collect();

        let all = store.list_entries(PageRequest::default()).unwrap();
        let listed: Vec<EntryId> = all.iter().map(|e| e.id).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(listed, expected);

        let page = store.list_entries(PageRequest::new(2, 1)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[3]);
        assert_eq!(page[1].id, ids[2]);
    }

    #[test]
    fn history_requires_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let err = store
            .insert_history(&history(EntryId::new(77), HistoryAction::Create))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn history_insert_returns_persisted_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = store.insert_entry(Some("e"), &json!({"v": 1})).unwrap();

        let record = store
            .insert_history(&history(id, HistoryAction::Create))
            .unwrap();
        assert_eq!(record.entry_id, id);
        assert_eq!(record.action, HistoryAction::Create);
        assert_eq!(record.after_document, Some(json!({"v": 1})));
        assert_eq!(record.before_document, None);

        let listed = store
            .list_history_for_entry(id, PageRequest::default())
            .unwrap();
        assert_eq!(listed, vec![record]);
    }

    #[test]
    fn delete_cascades_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = store.insert_entry(Some("e"), &json!({})).unwrap();
        store.insert_history(&history(id, HistoryAction::Create)).unwrap();
        store.insert_history(&history(id, HistoryAction::Update)).unwrap();

        assert!(store.delete_entry(id).unwrap());
        assert!(store.read_entry(id).unwrap().is_none());
        assert!(store
            .list_history_for_entry(id, PageRequest::default())
            .unwrap()
            .is_empty());
        assert!(store.list_history(PageRequest::default()).unwrap().is_empty());
        assert!(!store.delete_entry(id).unwrap());
    }

    #[test]
    fn joined_history_carries_current_entry_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let id = store.insert_entry(Some("before"), &json!({})).unwrap();
        let record = store.insert_history(&history(id, HistoryAction::Create)).unwrap();
        store.update_entry(id, Some("after"), &json!({})).unwrap();

        let all = store.list_history(PageRequest::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].entry_name.as_deref(), Some("after"));

        let single = store.read_history(record.id).unwrap().unwrap();
        assert_eq!(single.entry_name.as_deref(), Some("after"));
        assert!(store.read_history(HistoryId::new(12345)).unwrap().is_none());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let first = store.insert_entry(None, &json!(1)).unwrap();
        store.delete_entry(first).unwrap();
        let second = store.insert_entry(None, &json!(2)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn missing_schema_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStorage::open(&StoreConfig {
            path: dir.path().join("empty.db"),
            ..StoreConfig::default()
        })
        .unwrap();
        assert!(!store.schema_present().unwrap());
        assert!(store.read_entry(EntryId::new(1)).is_err());
    }
}
