//! Service category CRUD. Category names are unique.

use super::default_limit;
use crate::error::AppError;
use crate::models::ServiceCategory;
use crate::response::{Message, Page};
use crate::schemas::{ServiceCategoryCreate, ServiceCategoryUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub name: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &CategoryListParams) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &p.name {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<CategoryListParams>,
) -> Result<Json<Page<ServiceCategory>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM service_categories", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q
        .build_query_as::<ServiceCategory>()
        .fetch_all(&state.pool)
        .await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM service_categories");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn name_taken(conn: &mut PgConnection, name: &str) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM service_categories WHERE name = $1)",
    )
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<ServiceCategoryCreate>,
) -> Result<Json<ServiceCategory>, AppError> {
    let mut tx = state.pool.begin().await?;
    if name_taken(&mut tx, &body.name).await? {
        return Err(AppError::Conflict(
            "service category with this name already exists".into(),
        ));
    }
    let row = sqlx::query_as::<_, ServiceCategory>(&format!(
        "INSERT INTO service_categories (name, description) VALUES ($1, $2) RETURNING {}",
        COLUMNS
    ))
    .bind(&body.name)
    .bind(&body.description)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ServiceCategory>, AppError> {
    let row = sqlx::query_as::<_, ServiceCategory>(&format!(
        "SELECT {} FROM service_categories WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("service category"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ServiceCategoryUpdate>,
) -> Result<Json<ServiceCategory>, AppError> {
    let mut tx = state.pool.begin().await?;
    let mut row = sqlx::query_as::<_, ServiceCategory>(&format!(
        "SELECT {} FROM service_categories WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("service category"))?;

    if let Some(name) = &body.name {
        if *name != row.name && name_taken(&mut tx, name).await? {
            return Err(AppError::Conflict(
                "service category with this name already exists".into(),
            ));
        }
    }

    body.apply(&mut row);
    let row = sqlx::query_as::<_, ServiceCategory>(&format!(
        "UPDATE service_categories SET name = $1, description = $2, updated_at = NOW() \
         WHERE id = $3 RETURNING {}",
        COLUMNS
    ))
    .bind(&row.name)
    .bind(&row.description)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Message>, AppError> {
    // ON DELETE RESTRICT on services.category_id turns a delete of a
    // referenced category into a Conflict.
    let deleted =
        sqlx::query_scalar::<_, i32>("DELETE FROM service_categories WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("service category"));
    }
    Ok(Json(Message::deleted("Service category")))
}
