//! Defines the endpoints for listing expenses and their categories.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Environment, Error, FieldError,
    expense::{
        Expense, ExpenseQuery, SortOrder, list_categories, list_expenses, query::sum_amounts,
    },
};

/// The state needed to list expenses.
#[derive(Debug, Clone)]
pub struct ListExpensesState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Decides how much error detail is sent to the client.
    pub environment: Environment,
}

impl FromRef<AppState> for ListExpensesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            environment: state.environment,
        }
    }
}

/// The query parameters for listing expenses.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpensesParams {
    /// Only list expenses in this category, "all" lists every category.
    pub category: Option<String>,
    /// "date_desc" (the default) or "date_asc".
    #[serde(default)]
    pub sort: SortOrder,
}

/// The response body for listing expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseList {
    /// The matching expenses in the requested order.
    pub expenses: Vec<Expense>,
    /// The sum of the amounts of `expenses`.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// The number of `expenses`.
    pub count: usize,
}

/// A route handler for listing expenses with an optional category filter.
pub async fn list_expenses_endpoint(
    State(state): State<ListExpensesState>,
    params: Result<Query<ListExpensesParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            tracing::debug!("invalid expense query: {rejection}");
            return Error::Validation(vec![FieldError::new("query", &rejection.body_text())])
                .into_api_response(state.environment);
        }
    };

    let query = ExpenseQuery::new(params.category, params.sort);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_api_response(state.environment);
        }
    };

    match list_expenses(&query, &connection) {
        Ok(expenses) => Json(ExpenseList {
            total: sum_amounts(&expenses),
            count: expenses.len(),
            expenses,
        })
        .into_response(),
        Err(error) => {
            tracing::error!("could not list expenses: {error}");
            error.into_api_response(state.environment)
        }
    }
}

/// A route handler for getting the distinct expense categories in alphabetical order.
pub async fn get_categories_endpoint(State(state): State<ListExpensesState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_api_response(state.environment);
        }
    };

    match list_categories(&connection) {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => {
            tracing::error!("could not list categories: {error}");
            error.into_api_response(state.environment)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        endpoints,
        expense::{Expense, list_endpoint::ExpenseList},
        test_utils::get_test_server_and_state,
    };

    async fn post_expense(server: &TestServer, amount: f64, category: &str, date: &str) {
        server
            .post(endpoints::EXPENSES)
            .json(&json!({
                "amount": amount,
                "category": category,
                "description": "test",
                "date": date,
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn seeded_server() -> TestServer {
        let (server, _) = get_test_server_and_state();
        post_expense(&server, 45.99, "Food", "2024-01-15").await;
        post_expense(&server, 29.99, "Transport", "2024-01-14").await;
        post_expense(&server, 25.0, "Food", "2024-01-10").await;
        server
    }

    #[tokio::test]
    async fn lists_everything_newest_first() {
        let server = seeded_server().await;

        let response = server.get(endpoints::EXPENSES).await;

        response.assert_status_ok();
        let list = response.json::<ExpenseList>();
        assert_eq!(list.count, 3);
        assert_eq!(list.total.to_string(), "100.98");
        let dates: Vec<_> = list.expenses.iter().map(|expense| expense.date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 01 - 15),
                date!(2024 - 01 - 14),
                date!(2024 - 01 - 10)
            ]
        );
    }

    #[tokio::test]
    async fn filters_by_category_in_ascending_order() {
        let server = seeded_server().await;

        let response = server
            .get(endpoints::EXPENSES)
            .add_query_param("category", "Food")
            .add_query_param("sort", "date_asc")
            .await;

        response.assert_status_ok();
        let list = response.json::<ExpenseList>();
        assert_eq!(list.count, 2);
        assert!(list.expenses.iter().all(|expense| expense.category == "Food"));
        let dates: Vec<_> = list.expenses.iter().map(|expense| expense.date).collect();
        assert_eq!(dates, vec![date!(2024 - 01 - 10), date!(2024 - 01 - 15)]);
    }

    #[tokio::test]
    async fn all_category_lists_everything() {
        let server = seeded_server().await;

        let list = server
            .get(endpoints::EXPENSES)
            .add_query_param("category", "all")
            .await
            .json::<ExpenseList>();

        assert_eq!(list.count, 3);
    }

    #[tokio::test]
    async fn empty_category_lists_everything() {
        let server = seeded_server().await;

        let list = server
            .get(endpoints::EXPENSES)
            .add_query_param("category", "")
            .await
            .json::<ExpenseList>();

        assert_eq!(list.count, 3);
    }

    #[tokio::test]
    async fn total_is_a_json_number() {
        let server = seeded_server().await;

        let body = server.get(endpoints::EXPENSES).await.json::<Value>();

        assert_eq!(body["total"], json!(100.98));
        assert_eq!(body["count"], json!(3));
    }

    #[tokio::test]
    async fn empty_list() {
        let (server, _) = get_test_server_and_state();

        let list = server.get(endpoints::EXPENSES).await.json::<ExpenseList>();

        assert_eq!(
            list,
            ExpenseList {
                expenses: Vec::<Expense>::new(),
                total: rust_decimal::Decimal::ZERO,
                count: 0,
            }
        );
    }

    #[tokio::test]
    async fn rejects_unknown_sort() {
        let server = seeded_server().await;

        let response = server
            .get(endpoints::EXPENSES)
            .add_query_param("sort", "amount")
            .await;

        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["details"][0]["field"], "query");
    }

    #[tokio::test]
    async fn lists_sorted_categories() {
        let server = seeded_server().await;

        let response = server.get(endpoints::EXPENSE_CATEGORIES).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<String>>(), vec!["Food", "Transport"]);
    }
}
