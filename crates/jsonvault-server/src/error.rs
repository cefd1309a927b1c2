use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonvault_ledger::LedgerError;
use jsonvault_store::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The request body could not be read as JSON.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Route {0} not found")]
    RouteNotFound(String),

    /// The store could not be reached while starting up.
    #[error("Failed to connect to database: {0}")]
    Startup(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Ledger(LedgerError::Store(err))
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerError {
    /// Status code and caller-facing message.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Ledger(LedgerError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Self::Ledger(LedgerError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Entry not found".to_string())
            }
            Self::Ledger(LedgerError::HistoryNotFound(_)) => {
                (StatusCode::NOT_FOUND, "History record not found".to_string())
            }
            Self::Ledger(LedgerError::Store(StoreError::Conflict(_))) => {
                (StatusCode::CONFLICT, "Entry already exists".to_string())
            }
            Self::Ledger(LedgerError::Store(StoreError::Constraint(_))) => {
                (StatusCode::NOT_FOUND, "Referenced entry not found".to_string())
            }
            Self::Rejected { status, message } => (*status, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::RouteNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }

    /// Render the error, echoing internal detail on 5xx only when
    /// `expose_detail` is set.
    pub fn into_response_with_detail(self, expose_detail: bool) -> Response {
        let (status, message) = self.status_and_message();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            expose_detail.then(|| self.to_string())
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
            None
        };
        let body = ErrorBody {
            success: false,
            message,
            error,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        self.into_response_with_detail(false)
    }
}
