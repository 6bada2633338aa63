//! A liveness check for load balancers and uptime monitors.

use axum::Json;
use serde::Serialize;
use time::{OffsetDateTime, serde::rfc3339};

/// The response body for the health check.
#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    #[serde(with = "rfc3339")]
    timestamp: OffsetDateTime,
}

/// Report that the server is running.
///
/// Does not touch the database.
pub async fn get_health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: OffsetDateTime::now_utc(),
    })
}
