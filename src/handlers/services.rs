//! Service CRUD and listing by category.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::Service;
use crate::response::{Message, Page};
use crate::schemas::{ServiceCreate, ServiceUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str =
    "id, name, price, duration_minutes, description, category_id, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/category/:category_id", get(list_by_category))
}

#[derive(Debug, Deserialize)]
pub struct ServiceListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub name: Option<String>,
    pub category_id: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub duration: Option<i32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &ServiceListParams) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &p.name {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(category) = p.category_id {
        qb.push(" AND category_id = ").push_bind(category);
    }
    if let Some(min) = p.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = p.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(duration) = p.duration {
        qb.push(" AND duration_minutes = ").push_bind(duration);
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<ServiceListParams>,
) -> Result<Json<Page<Service>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM services", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q.build_query_as::<Service>().fetch_all(&state.pool).await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM services");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn category_exists(conn: &mut PgConnection, id: i32) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM service_categories WHERE id = $1)",
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<ServiceCreate>,
) -> Result<Json<Service>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    if let Some(category) = body.category_id {
        if !category_exists(&mut tx, category).await? {
            return Err(AppError::not_found("service category"));
        }
    }
    let row = sqlx::query_as::<_, Service>(&format!(
        "INSERT INTO services (name, price, duration_minutes, description, category_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        COLUMNS
    ))
    .bind(&body.name)
    .bind(body.price)
    .bind(body.duration_minutes)
    .bind(&body.description)
    .bind(body.category_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Service>, AppError> {
    let row =
        sqlx::query_as::<_, Service>(&format!("SELECT {} FROM services WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::not_found("service"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ServiceUpdate>,
) -> Result<Json<Service>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    let mut row =
        sqlx::query_as::<_, Service>(&format!("SELECT {} FROM services WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("service"))?;

    if let Some(Some(category)) = body.category_id {
        if !category_exists(&mut tx, category).await? {
            return Err(AppError::not_found("service category"));
        }
    }

    body.apply(&mut row);
    let row = sqlx::query_as::<_, Service>(&format!(
        "UPDATE services SET name = $1, price = $2, duration_minutes = $3, description = $4, \
         category_id = $5, updated_at = NOW() WHERE id = $6 RETURNING {}",
        COLUMNS
    ))
    .bind(&row.name)
    .bind(row.price)
    .bind(row.duration_minutes)
    .bind(&row.description)
    .bind(row.category_id)
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
    let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM services WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("service"));
    }
    Ok(Json(Message::deleted("Service")))
}

async fn list_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<Service>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    if !category_exists(&mut conn, category_id).await? {
        return Err(AppError::not_found("service category"));
    }
    let items = sqlx::query_as::<_, Service>(&format!(
        "SELECT {} FROM services WHERE category_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        COLUMNS
    ))
    .bind(category_id)
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&mut *conn)
    .await?;
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(Json(Page { items, total }))
}
