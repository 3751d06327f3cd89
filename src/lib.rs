//! Salon management backend: customers, staff, services and categories,
//! appointments, feedback, promotions, and a Q&A knowledge base over
//! PostgreSQL.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod schemas;
pub mod state;

pub use config::Config;
pub use db::{connect, ensure_database_exists};
pub use error::AppError;
pub use migration::apply_migrations;
pub use routes::{api_routes, common::common_routes};
pub use state::AppState;
