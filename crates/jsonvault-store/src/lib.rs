//! Storage for jsonvault.
//!
//! This crate is the relational store behind the entry store and the history
//! recorder. It owns two tables and one view:
//!
//! - `entries` -- canonical current state of every document
//! - `history` -- append-only audit rows, `ON DELETE CASCADE` from `entries`
//! - `history_view` -- `history` joined with the owning entry's name
//!
//! # Storage Backends
//!
//! All backends implement the [`Storage`] trait:
//!
//! - [`SqliteStorage`] -- SQLite file behind a bounded [`ConnectionPool`]
//! - [`InMemoryStorage`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every operation checks out one pooled connection and returns it on exit.
//! 2. Documents are stored as JSON text and decoded on every read.
//! 3. No operation retries; failures surface to the caller immediately.
//! 4. Constraint violations are classified, not flattened into generic errors.

mod codec;
pub mod config;
pub mod error;
pub mod memory;
pub mod pool;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStorage;
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use sqlite::SqliteStorage;
pub use traits::{NewHistoryRecord, Storage};
