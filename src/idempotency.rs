//! Storage for idempotency keys and the responses they replay.
//!
//! A client that may retry a request attaches a key of its choosing. The first
//! request that completes with that key stores its response body here, and any
//! later request with the same key gets that exact body back instead of
//! repeating the operation. The stored body is a copy, so it does not change
//! if the underlying record does.

use std::fmt::Display;

use rusqlite::{
    Connection, OptionalExtension, Row,
    types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use time::OffsetDateTime;

use crate::{Error, FieldError};

/// A client-supplied token that identifies one logical request.
///
/// The key is opaque, the only requirement is that it is not empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Create an idempotency key.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `key` is an empty string.
    pub fn new(key: &str) -> Result<Self, Error> {
        if key.is_empty() {
            Err(Error::Validation(vec![FieldError::new(
                "idempotencyKey",
                "Idempotency key cannot be empty",
            )]))
        } else {
            Ok(Self(key.to_owned()))
        }
    }

    /// Create an idempotency key without validation.
    ///
    /// The caller should ensure that the string is not empty.
    #[cfg(test)]
    pub fn new_unchecked(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for IdempotencyKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for IdempotencyKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(Self)
    }
}

/// A response that was sent for an idempotency key.
///
/// Records are written once and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    /// The key the client sent.
    pub key: IdempotencyKey,
    /// The exact JSON body of the original response.
    pub response: String,
    /// When the original request completed.
    pub created_at: OffsetDateTime,
}

/// Look up the record stored for `key`.
///
/// Returns `Ok(None)` if no request with `key` has completed yet.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_idempotency_record(
    key: &IdempotencyKey,
    connection: &Connection,
) -> Result<Option<IdempotencyRecord>, Error> {
    let record = connection
        .prepare("SELECT key, response, created_at FROM idempotency_key WHERE key = :key")?
        .query_row(&[(":key", key)], map_idempotency_row)
        .optional()?;

    Ok(record)
}

/// Store `response` as the response for `key`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateIdempotencyKey] if a record for `key` already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_idempotency_record(
    key: &IdempotencyKey,
    response: &str,
    connection: &Connection,
) -> Result<IdempotencyRecord, Error> {
    connection
        .prepare(
            "INSERT INTO idempotency_key (key, response, created_at)
             VALUES (?1, ?2, ?3)
             RETURNING key, response, created_at",
        )?
        .query_row(
            (key, response, OffsetDateTime::now_utc()),
            map_idempotency_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code:
                        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateIdempotencyKey,
            error => error.into(),
        })
}

/// Create the idempotency key table in the database.
///
/// The primary key on `key` is what guarantees at most one record per key,
/// even when several servers share the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_idempotency_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS idempotency_key (
                key TEXT PRIMARY KEY NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_idempotency_row(row: &Row) -> Result<IdempotencyRecord, rusqlite::Error> {
    Ok(IdempotencyRecord {
        key: row.get(0)?,
        response: row.get(1)?,
        created_at: row.get(2)?,
    })
}
