//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState, endpoints,
    expense::{create_expense_endpoint, get_categories_endpoint, list_expenses_endpoint},
    health::get_health,
    logging::logging_middleware,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::EXPENSES,
            post(create_expense_endpoint).get(list_expenses_endpoint),
        )
        .route(endpoints::EXPENSE_CATEGORIES, get(get_categories_endpoint))
        .route(endpoints::HEALTH, get(get_health))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::test_utils::get_test_server_and_state;

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (server, _) = get_test_server_and_state();

        let response = server.get("/does/not/exist").await;

        response.assert_status_not_found();
        assert_eq!(response.json::<Value>(), json!({ "error": "Route not found" }));
    }
}
