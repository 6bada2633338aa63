//! An HTTP backend for tracking personal expenses.
//!
//! Clients record expenses with `POST /expenses` and read them back, filtered
//! by category and sorted by date, with `GET /expenses`. Creating an expense
//! accepts an optional idempotency key so that a retried request replays the
//! first response instead of recording the same expense twice.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use serde_json::json;
use tokio::signal;

mod app_state;
mod db;
mod endpoints;
mod expense;
mod health;
mod idempotency;
mod logging;
mod not_found;
mod routing;
#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, Environment};
pub use db::initialize as initialize_db;
pub use expense::{
    Amount, Category, Description, Expense, ExpenseId, NewExpense, create_expense,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// A problem with a single field of a request, e.g. a negative amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The name of the offending field as the client sent it, e.g. "amount".
    pub field: String,
    /// A human readable explanation of what is wrong with the field.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request failed validation. Nothing was written to the database.
    ///
    /// Holds one entry per invalid field so that the client can fix them all
    /// at once.
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// A write violated a unique constraint that is not the idempotency key.
    #[error("the expense already exists in the database")]
    DuplicateEntry,

    /// The idempotency key has already been recorded.
    ///
    /// Callers creating expenses should treat this as a signal to replay the
    /// stored response rather than as a failure.
    #[error("the idempotency key already exists in the database")]
    DuplicateIdempotencyKey,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code:
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                },
                _,
            ) => Error::DuplicateEntry,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_api_response(Environment::Production)
    }
}

impl Error {
    /// Convert the error into a JSON response.
    ///
    /// Unexpected errors only include the error message in the response body
    /// when running in [Environment::Development]. In production the details
    /// are only written to the server logs.
    pub fn into_api_response(self, environment: Environment) -> Response {
        match self {
            Error::Validation(details) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "error": "Validation error",
                    "details": details,
                })),
            )
                .into_response(),
            Error::DuplicateEntry | Error::DuplicateIdempotencyKey => (
                StatusCode::CONFLICT,
                axum::Json(json!({
                    "error": "Duplicate entry",
                    "details": "This expense already exists",
                })),
            )
                .into_response(),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                axum::Json(json!({
                    "error": "The requested resource could not be found",
                })),
            )
                .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);

                let message = match environment {
                    Environment::Development => error.to_string(),
                    Environment::Production => "Something went wrong".to_owned(),
                };

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({
                        "error": "Internal server error",
                        "message": message,
                    })),
                )
                    .into_response()
            }
        }
    }
}
