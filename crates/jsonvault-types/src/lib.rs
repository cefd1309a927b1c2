//! Foundation types for jsonvault.
//!
//! This crate provides the identifiers, records, and pagination types shared
//! by every other jsonvault crate.
//!
//! # Key Types
//!
//! - [`EntryId`] / [`HistoryId`] -- Storage-assigned row identifiers
//! - [`Entry`] -- Canonical current state of a stored JSON document
//! - [`HistoryRecord`] / [`HistoryAction`] -- One row of the append-only audit trail
//! - [`PageRequest`] -- Clamped limit/offset pair used by every list operation

pub mod entry;
pub mod error;
pub mod history;
pub mod ids;
pub mod page;
pub mod temporal;

pub use entry::Entry;
pub use error::TypeError;
pub use history::{HistoryAction, HistoryRecord};
pub use ids::{EntryId, HistoryId};
pub use page::PageRequest;
