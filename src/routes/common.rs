//! Root welcome route and database health check.

use crate::db;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Welcome {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    database: String,
}

async fn root() -> Json<Welcome> {
    Json(Welcome {
        message: "Welcome to the Salon Management API",
    })
}

async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthBody>, (StatusCode, Json<HealthBody>)> {
    match db::ping(&state.pool).await {
        Ok(()) => Ok(Json(HealthBody {
            status: "healthy",
            database: "connected".into(),
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthBody {
                status: "unhealthy",
                database: e.to_string(),
            }),
        )),
    }
}

pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
}
