//! HTTP server for jsonvault.
//!
//! Exposes the entry store and its history as a JSON REST API under `/api`.
//! Every response body is an envelope of the form
//! `{success, message?, data, pagination?}`; failures carry
//! `{success: false, message, error?}`.

pub mod config;
pub mod error;
pub mod handler;
pub mod response;
pub mod router;
pub mod server;

pub use config::{ConfigError, Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use response::{Envelope, HealthStatus, Pagination};
pub use server::VaultServer;
