//! Sets up the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, expense::create_expense_table, idempotency::create_idempotency_table};

/// Create all the tables for the domain models.
///
/// Tables are only created if they do not already exist, so this function is
/// safe to call every time the server starts.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_expense_table(&transaction)?;
    create_idempotency_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
