//! The API endpoints URIs.

/// The route for creating and listing expenses.
pub const EXPENSES: &str = "/expenses";
/// The route for listing the distinct expense categories.
pub const EXPENSE_CATEGORIES: &str = "/expenses/categories";
/// The route for checking that the server is up.
pub const HEALTH: &str = "/health";
