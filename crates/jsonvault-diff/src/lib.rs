//! Diff engine for jsonvault.
//!
//! Computes the structural delta between two JSON documents as a
//! [`ChangeSet`] of dotted field paths. The engine is pure and infallible.
//!
//! # Key Types
//!
//! - [`ChangeSet`] -- added / removed / modified paths
//! - [`compute_changes`] -- the diff entry point
//! - [`values_equal`] -- structural equality used to decide "modified"

pub mod changes;
pub mod equality;

pub use changes::{compute_changes, ChangeSet, ROOT_PATH};
pub use equality::values_equal;
