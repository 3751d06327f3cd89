//! Promotion CRUD and active-window queries.
//!
//! "Active" is computed from start_date/end_date against the current time;
//! the stored is_active flag is returned in payloads but is not consulted by
//! the window filters. An open end_date means the promotion never expires.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::Promotion;
use crate::response::{Message, Page};
use crate::schemas::{PromotionCreate, PromotionUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str = "id, title, description, discount_percent, start_date, end_date, \
                       service_id, is_active, created_at, updated_at";

const ACTIVE_WINDOW: &str = "start_date <= NOW() AND (end_date IS NULL OR end_date >= NOW())";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/active/now", get(list_active))
        .route("/:id", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct PromotionListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Substring match on the promotion title.
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub service_id: Option<i32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &PromotionListParams) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &p.name {
        qb.push(" AND title ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(active) = p.is_active {
        if active {
            qb.push(" AND ").push(ACTIVE_WINDOW);
        } else {
            qb.push(" AND (end_date < NOW() OR start_date > NOW())");
        }
    }
    if let Some(service) = p.service_id {
        qb.push(" AND service_id = ").push_bind(service);
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<PromotionListParams>,
) -> Result<Json<Page<Promotion>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM promotions", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q
        .build_query_as::<Promotion>()
        .fetch_all(&state.pool)
        .await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM promotions");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn service_exists(conn: &mut PgConnection, id: i32) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM services WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<PromotionCreate>,
) -> Result<Json<Promotion>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    if let Some(service) = body.service_id {
        if !service_exists(&mut tx, service).await? {
            return Err(AppError::not_found("service"));
        }
    }
    let row = sqlx::query_as::<_, Promotion>(&format!(
        "INSERT INTO promotions (title, description, discount_percent, start_date, end_date, \
         service_id, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
        COLUMNS
    ))
    .bind(&body.title)
    .bind(&body.description)
    .bind(body.discount_percent)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(body.service_id)
    .bind(body.is_active)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Promotion>, AppError> {
    let row = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT {} FROM promotions WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("promotion"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<PromotionUpdate>,
) -> Result<Json<Promotion>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    let mut row = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT {} FROM promotions WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("promotion"))?;

    if let Some(Some(service)) = body.service_id {
        if !service_exists(&mut tx, service).await? {
            return Err(AppError::not_found("service"));
        }
    }

    body.apply(&mut row);
    let row = sqlx::query_as::<_, Promotion>(&format!(
        "UPDATE promotions SET title = $1, description = $2, discount_percent = $3, \
         start_date = $4, end_date = $5, service_id = $6, is_active = $7, updated_at = NOW() \
         WHERE id = $8 RETURNING {}",
        COLUMNS
    ))
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.discount_percent)
    .bind(row.start_date)
    .bind(row.end_date)
    .bind(row.service_id)
    .bind(row.is_active)
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
    let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM promotions WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("promotion"));
    }
    Ok(Json(Message::deleted("Promotion")))
}

async fn list_active(
    State(state): State<AppState>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<Promotion>>, AppError> {
    let items = sqlx::query_as::<_, Promotion>(&format!(
        "SELECT {} FROM promotions WHERE {} ORDER BY id LIMIT $1 OFFSET $2",
        COLUMNS, ACTIVE_WINDOW
    ))
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&state.pool)
    .await?;
    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM promotions WHERE {}",
        ACTIVE_WINDOW
    ))
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(Page { items, total }))
}
