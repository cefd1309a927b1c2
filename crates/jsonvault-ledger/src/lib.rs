//! Core of jsonvault: the entry store and its append-only history.
//!
//! This crate provides:
//! - [`EntryStore`] for create/read/list/update/delete of JSON documents
//! - [`HistoryRecorder`] appending one audit row per mutation
//! - [`HistoryDraft`] constructors that fix the payload shape of each action
//! - [`safe_json_string`], the serialization fallback for history payloads
//!
//! Storage is reached through [`jsonvault_store::Storage`], so the same core
//! runs over SQLite or the in-memory backend.

pub mod entries;
pub mod error;
pub mod history;

pub use entries::{DeletedEntry, EntryStore, EntryUpdate, NewEntry, DELETED_MESSAGE};
pub use error::{LedgerError, LedgerResult};
pub use history::{safe_json_string, HistoryDraft, HistoryRecorder};
