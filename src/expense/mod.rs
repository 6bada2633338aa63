//! Expense management for the expense tracker.
//!
//! This module contains everything related to expenses:
//! - The `Expense` model and the validated types used to create one
//! - Database functions for storing and querying expenses
//! - Idempotent creation of expenses
//! - Route handlers for the expense endpoints

mod core;
mod create_endpoint;
mod form;
mod idempotent_create;
mod list_endpoint;
mod query;

pub use core::{
    Amount, Category, Description, Expense, ExpenseId, NewExpense, create_expense,
    create_expense_table, map_expense_row,
};
pub use create_endpoint::create_expense_endpoint;
pub use form::ExpenseForm;
pub use idempotent_create::{CreateExpenseOutcome, create_expense_idempotent};
pub use list_endpoint::{get_categories_endpoint, list_expenses_endpoint};
pub use query::{ExpenseQuery, SortOrder, list_categories, list_expenses};

#[cfg(test)]
pub use core::{count_expenses, get_expense};
