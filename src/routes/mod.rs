pub mod common;

use crate::handlers::{
    appointments, customers, feedback, knowledge_base, promotions, service_categories, services,
    staff,
};
use crate::state::AppState;
use axum::Router;

/// All entity routers, mounted by resource name. Nest under the API prefix.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/customers", customers::router())
        .nest("/staff", staff::router())
        .nest("/services", services::router())
        .nest("/service-categories", service_categories::router())
        .nest("/appointments", appointments::router())
        .nest("/feedback", feedback::router())
        .nest("/promotions", promotions::router())
        .nest("/knowledge-base", knowledge_base::router())
        .with_state(state)
}
