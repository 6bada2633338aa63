//! Defines the endpoint for creating a new expense.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Environment, Error, FieldError,
    expense::{CreateExpenseOutcome, ExpenseForm, create_expense_idempotent},
};

/// The request header a client may use instead of the `idempotencyKey` body field.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// The state needed to create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Decides how much error detail is sent to the client.
    pub environment: Environment,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            environment: state.environment,
        }
    }
}

/// A route handler for creating a new expense.
///
/// Responds with 201 and the new expense, or with 200 and the original
/// response body if the idempotency key has been seen before.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    headers: HeaderMap,
    form: Result<Json<ExpenseForm>, JsonRejection>,
) -> Response {
    let Json(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::debug!("could not parse expense JSON: {rejection}");
            return Error::Validation(vec![FieldError::new("body", &rejection.body_text())])
                .into_api_response(state.environment);
        }
    };

    let header_key = match headers.get(IDEMPOTENCY_KEY_HEADER).map(|value| value.to_str()) {
        None => None,
        Some(Ok(key)) => Some(key.to_owned()),
        Some(Err(_)) => {
            return Error::Validation(vec![FieldError::new(
                "Idempotency-Key",
                "Idempotency-Key header must only contain visible ASCII characters",
            )])
            .into_api_response(state.environment);
        }
    };

    let form = match form.validate(header_key) {
        Ok(form) => form,
        Err(error) => {
            tracing::debug!("rejected invalid expense: {error}");
            return error.into_api_response(state.environment);
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_api_response(state.environment);
        }
    };

    match create_expense_idempotent(form.expense, form.idempotency_key.as_ref(), &connection) {
        Ok(outcome) => outcome_response(outcome),
        Err(error) => {
            tracing::error!("could not create expense: {error}");
            error.into_api_response(state.environment)
        }
    }
}

fn outcome_response(outcome: CreateExpenseOutcome) -> Response {
    let status = match outcome {
        CreateExpenseOutcome::Created { .. } => StatusCode::CREATED,
        CreateExpenseOutcome::Replayed { .. } => StatusCode::OK,
    };

    (
        status,
        [(CONTENT_TYPE, "application/json")],
        outcome.response().to_owned(),
    )
        .into_response()
}
