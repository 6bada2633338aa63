//! Creates expenses so that retried requests do not record the same expense twice.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    expense::{Expense, NewExpense, create_expense},
    idempotency::{IdempotencyKey, get_idempotency_record, insert_idempotency_record},
};

/// What happened when creating an expense.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateExpenseOutcome {
    /// A new expense was written to the database.
    Created {
        /// The new expense.
        expense: Expense,
        /// The JSON body to send to the client.
        response: String,
    },
    /// The idempotency key had already been used, nothing was written.
    Replayed {
        /// The JSON body that was sent for the first request with the key.
        response: String,
    },
}

impl CreateExpenseOutcome {
    /// The JSON body to send to the client.
    pub fn response(&self) -> &str {
        match self {
            CreateExpenseOutcome::Created { response, .. } => response,
            CreateExpenseOutcome::Replayed { response } => response,
        }
    }
}

/// Create an expense unless a request with the same idempotency `key` has
/// already done so.
///
/// Without a key, every call creates a new expense.
///
/// With a key, the response stored for that key is replayed if there is one.
/// Otherwise the expense and the key are written in a single transaction, so
/// either both are stored or neither is. If another request stores the same
/// key first, the transaction is rolled back and that request's response is
/// replayed.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEntry] if the expense clashes with an existing expense,
/// - [Error::JSONSerializationError] if the expense cannot be serialized,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense_idempotent(
    expense: NewExpense,
    key: Option<&IdempotencyKey>,
    connection: &Connection,
) -> Result<CreateExpenseOutcome, Error> {
    let Some(key) = key else {
        let expense = create_expense(expense, connection)?;
        let response = serde_json::to_string(&expense)?;

        return Ok(CreateExpenseOutcome::Created { expense, response });
    };

    if let Some(record) = get_idempotency_record(key, connection)? {
        tracing::info!("Replaying stored response for idempotency key {key:?}");

        return Ok(CreateExpenseOutcome::Replayed {
            response: record.response,
        });
    }

    create_expense_with_key(expense, key, connection)
}

fn create_expense_with_key(
    expense: NewExpense,
    key: &IdempotencyKey,
    connection: &Connection,
) -> Result<CreateExpenseOutcome, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let expense = create_expense(expense, &transaction)?;
    let response = serde_json::to_string(&expense)?;

    match insert_idempotency_record(key, &response, &transaction) {
        Ok(_) => {
            transaction.commit()?;

            Ok(CreateExpenseOutcome::Created { expense, response })
        }
        Err(Error::DuplicateIdempotencyKey) => {
            transaction.rollback()?;

            tracing::warn!(
                "Idempotency key {key:?} was stored by a concurrent request, replaying its response"
            );

            let record = get_idempotency_record(key, connection)?.ok_or(Error::NotFound)?;

            Ok(CreateExpenseOutcome::Replayed {
                response: record.response,
            })
        }
        Err(error) => Err(error),
    }
}
