//! Defines the core data models and database queries for expenses.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::{Error, FieldError};

// ============================================================================
// MODELS
// ============================================================================

/// The largest amount that a single expense may have.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// The maximum number of characters in a category name.
pub const MAX_CATEGORY_LENGTH: usize = 50;

/// The maximum number of characters in an expense description.
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The unique, opaque identifier of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    /// Generate a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for ExpenseId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for ExpenseId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Uuid::parse_str(value.as_str()?)
            .map(Self)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A validated amount of money, strictly positive and at most [MAX_AMOUNT].
///
/// Amounts are fixed-point decimals and are stored in the database as text so
/// that they never pass through floating point. In JSON they are written as
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    /// Create an amount.
    ///
    /// Trailing zeros are dropped, so `45.990` is stored as `45.99`.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `value` is zero,
    /// negative, or larger than [MAX_AMOUNT].
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value <= Decimal::ZERO {
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount must be positive",
            )]))
        } else if value > MAX_AMOUNT {
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount is too large",
            )]))
        } else {
            Ok(Self(value.normalize()))
        }
    }

    /// Create an amount without validation.
    ///
    /// The caller should ensure that the value is positive and no larger than [MAX_AMOUNT].
    pub fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// The amount as a decimal number.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Decimal::from_str(value.as_str()?)
            .map(Self)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Check that `text` has between one and `max_length` characters.
///
/// Characters are counted as grapheme clusters so that e.g. emoji made up of
/// several code points count once.
fn validate_text(
    text: &str,
    max_length: usize,
    field: &str,
    required_message: &str,
    too_long_message: &str,
) -> Result<String, Error> {
    let text = text.trim();
    let length = text.graphemes(true).count();

    if length == 0 {
        Err(Error::Validation(vec![FieldError::new(
            field,
            required_message,
        )]))
    } else if length > max_length {
        Err(Error::Validation(vec![FieldError::new(
            field,
            too_long_message,
        )]))
    } else {
        Ok(text.to_owned())
    }
}

/// A validated category name, e.g. "Food".
///
/// Surrounding whitespace is removed. The name must not be empty and must have
/// at most [MAX_CATEGORY_LENGTH] characters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category(String);

impl Category {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `name` is empty or too long.
    pub fn new(name: &str) -> Result<Self, Error> {
        validate_text(
            name,
            MAX_CATEGORY_LENGTH,
            "category",
            "Category is required",
            "Category is too long",
        )
        .map(Self)
    }

    /// Create a category name without validation.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the invariants
    /// are violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated expense description, e.g. "Lunch at cafe".
///
/// Surrounding whitespace is removed. The text must not be empty and must have
/// at most [MAX_DESCRIPTION_LENGTH] characters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Description(String);

impl Description {
    /// Create a description.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `text` is empty or too long.
    pub fn new(text: &str) -> Result<Self, Error> {
        validate_text(
            text,
            MAX_DESCRIPTION_LENGTH,
            "description",
            "Description is required",
            "Description is too long",
        )
        .map(Self)
    }

    /// Create a description without validation.
    pub fn new_unchecked(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Money that was spent on something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// How much money was spent.
    pub amount: Amount,
    /// What kind of expense this was, e.g. "Food" or "Transport".
    pub category: String,
    /// A text description of what the expense was for.
    pub description: String,
    /// When the money was spent.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// When the expense was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the expense was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The validated data needed to record a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// How much money was spent.
    pub amount: Amount,
    /// What kind of expense this was.
    pub category: Category,
    /// What the expense was for.
    pub description: Description,
    /// When the money was spent.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Record a new expense in the database.
///
/// The ID and timestamps are assigned here.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEntry] if the generated ID clashes with an existing expense,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(expense: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    insert_expense(ExpenseId::new(), expense, connection)
}

fn insert_expense(
    id: ExpenseId,
    expense: NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let now = OffsetDateTime::now_utc();

    let expense = connection
        .prepare(
            "INSERT INTO expense (id, amount, category, description, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, amount, category, description, date, created_at, updated_at",
        )?
        .query_row(
            (
                id,
                expense.amount,
                expense.category.as_ref(),
                expense.description.as_ref(),
                expense.date,
                now,
                now,
            ),
            map_expense_row,
        )?;

    Ok(expense)
}

/// Retrieve an expense from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - or [Error::SqlError] there is some other SQL error.
#[cfg(test)]
pub fn get_expense(id: ExpenseId, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT id, amount, category, description, date, created_at, updated_at
             FROM expense WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_expense_row)?;

    Ok(expense)
}

/// Get the total number of expenses in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_expenses(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM expense;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id TEXT PRIMARY KEY NOT NULL,
                amount TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    // Used when listing expenses by category and date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_category_date ON expense(category, date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_date ON expense(date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Expense.
///
/// Expects the columns id, amount, category, description, date, created_at
/// and updated_at, in that order.
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let category = row.get(2)?;
    let description = row.get(3)?;
    let date = row.get(4)?;
    let created_at = row.get(5)?;
    let updated_at = row.get(6)?;

    Ok(Expense {
        id,
        amount,
        category,
        description,
        date,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod model_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::json;
    use time::macros::{date, datetime};

    use crate::{
        Error, FieldError,
        expense::{Amount, Category, Description, Expense, ExpenseId},
    };

    #[test]
    fn amount_rejects_zero() {
        assert_eq!(
            Amount::new(Decimal::ZERO),
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount must be positive"
            )]))
        );
    }

    #[test]
    fn amount_rejects_negative() {
        let result = Amount::new(Decimal::from_str("-12.50").unwrap());

        assert!(
            matches!(result, Err(Error::Validation(_))),
            "got {result:?}"
        );
    }

    #[test]
    fn amount_accepts_upper_bound() {
        let result = Amount::new(Decimal::from(1_000_000_000));

        assert!(result.is_ok(), "got {result:?}");
    }

    #[test]
    fn amount_rejects_above_upper_bound() {
        let result = Amount::new(Decimal::from_str("1000000000.01").unwrap());

        assert_eq!(
            result,
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount is too large"
            )]))
        );
    }

    #[test]
    fn amount_drops_trailing_zeros() {
        let amount = Amount::new(Decimal::from_str("45.990").unwrap()).unwrap();

        assert_eq!(amount.to_string(), "45.99");
    }

    #[test]
    fn category_is_trimmed() {
        let category = Category::new("  Food ").unwrap();

        assert_eq!(category.as_ref(), "Food");
    }

    #[test]
    fn category_rejects_blank() {
        assert_eq!(
            Category::new("   "),
            Err(Error::Validation(vec![FieldError::new(
                "category",
                "Category is required"
            )]))
        );
    }

    #[test]
    fn category_length_counts_graphemes() {
        // Each flag is two code points but one character.
        let flags = "🇳🇿".repeat(50);

        assert!(Category::new(&flags).is_ok());
        assert!(Category::new(&(flags + "🇳🇿")).is_err());
    }

    #[test]
    fn description_rejects_too_long() {
        let text = "a".repeat(201);

        assert_eq!(
            Description::new(&text),
            Err(Error::Validation(vec![FieldError::new(
                "description",
                "Description is too long"
            )]))
        );
    }

    #[test]
    fn expense_serializes_as_camel_case_json() {
        let expense = Expense {
            id: ExpenseId::new(),
            amount: Amount::new_unchecked(Decimal::from_str("45.99").unwrap()),
            category: "Food".to_owned(),
            description: "Lunch at cafe".to_owned(),
            date: date!(2024 - 01 - 15),
            created_at: datetime!(2024-01-15 12:30:00 UTC),
            updated_at: datetime!(2024-01-15 12:30:00 UTC),
        };

        let value = serde_json::to_value(&expense).unwrap();

        assert_eq!(value["id"], json!(expense.id.to_string()));
        assert_eq!(value["amount"], json!(45.99));
        assert_eq!(value["date"], json!("2024-01-15"));
        assert_eq!(value["createdAt"], json!("2024-01-15T12:30:00Z"));
        assert_eq!(value["updatedAt"], json!("2024-01-15T12:30:00Z"));
    }
}
