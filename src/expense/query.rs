//! Database queries for listing expenses and their categories.

use rusqlite::{Connection, types::Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    expense::{Expense, map_expense_row},
};

/// The category filter value that matches every category.
pub const ALL_CATEGORIES: &str = "all";

/// The order to sort expenses by date.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Newest expenses first.
    #[default]
    #[serde(rename = "date_desc")]
    DateDescending,
    /// Oldest expenses first.
    #[serde(rename = "date_asc")]
    DateAscending,
}

/// Defines which expenses [list_expenses] returns and in what order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpenseQuery {
    /// Only include expenses with exactly this category. `None` includes all categories.
    pub category: Option<String>,
    /// The order to return expenses in.
    pub sort: SortOrder,
}

impl ExpenseQuery {
    /// Create a query from the raw `category` query parameter.
    ///
    /// A missing or empty category, or [ALL_CATEGORIES], disables the category filter.
    pub fn new(category: Option<String>, sort: SortOrder) -> Self {
        let category =
            category.filter(|category| !category.is_empty() && category != ALL_CATEGORIES);

        Self { category, sort }
    }
}

/// Retrieve expenses from the database in the way defined by `query`.
///
/// Expenses on the same date are ordered by when they were recorded, in the
/// same direction as the date.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_expenses(query: &ExpenseQuery, connection: &Connection) -> Result<Vec<Expense>, Error> {
    let mut sql = String::from(
        "SELECT id, amount, category, description, date, created_at, updated_at FROM expense",
    );
    let mut params: Vec<Value> = Vec::new();

    if let Some(ref category) = query.category {
        sql.push_str(" WHERE category = ?1");
        params.push(Value::Text(category.clone()));
    }

    match query.sort {
        SortOrder::DateDescending => {
            sql.push_str(" ORDER BY date DESC, created_at DESC, rowid DESC")
        }
        SortOrder::DateAscending => sql.push_str(" ORDER BY date ASC, created_at ASC, rowid ASC"),
    }

    connection
        .prepare(&sql)?
        .query_map(rusqlite::params_from_iter(params.iter()), map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Get the distinct categories used by expenses, sorted alphabetically.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn list_categories(connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare("SELECT DISTINCT category FROM expense ORDER BY category ASC")?
        .query_map([], |row| row.get(0))?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Add up the amounts of `expenses` without rounding.
pub fn sum_amounts(expenses: &[Expense]) -> Decimal {
    expenses
        .iter()
        .map(|expense| expense.amount.value())
        .sum::<Decimal>()
        .normalize()
}
