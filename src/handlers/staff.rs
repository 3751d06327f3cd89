//! Staff CRUD and the by-skill lookup.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::Staff;
use crate::response::{Message, Page};
use crate::schemas::{StaffCreate, StaffUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::types::Json as Jsonb;
use sqlx::{Postgres, QueryBuilder};

const COLUMNS: &str = "id, name, role, skills, is_active, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/by-skill/:skill", get(list_by_skill))
}

#[derive(Debug, Deserialize)]
pub struct StaffListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &StaffListParams) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &p.name {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(role) = &p.role {
        qb.push(" AND role ILIKE ").push_bind(format!("%{}%", role));
    }
    if let Some(active) = p.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<StaffListParams>,
) -> Result<Json<Page<Staff>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM staff", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q.build_query_as::<Staff>().fetch_all(&state.pool).await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM staff");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<StaffCreate>,
) -> Result<Json<Staff>, AppError> {
    let row = sqlx::query_as::<_, Staff>(&format!(
        "INSERT INTO staff (name, role, skills, is_active) VALUES ($1, $2, $3, $4) RETURNING {}",
        COLUMNS
    ))
    .bind(&body.name)
    .bind(&body.role)
    .bind(body.skills.clone().map(Jsonb))
    .bind(body.is_active)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Staff>, AppError> {
    let row = sqlx::query_as::<_, Staff>(&format!("SELECT {} FROM staff WHERE id = $1", COLUMNS))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("staff member"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StaffUpdate>,
) -> Result<Json<Staff>, AppError> {
    let mut tx = state.pool.begin().await?;
    let mut row =
        sqlx::query_as::<_, Staff>(&format!("SELECT {} FROM staff WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("staff member"))?;
    body.apply(&mut row);
    let row = sqlx::query_as::<_, Staff>(&format!(
        "UPDATE staff SET name = $1, role = $2, skills = $3, is_active = $4, updated_at = NOW() \
         WHERE id = $5 RETURNING {}",
        COLUMNS
    ))
    .bind(&row.name)
    .bind(&row.role)
    .bind(&row.skills)
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
    let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM staff WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("staff member"));
    }
    Ok(Json(Message::deleted("Staff member")))
}

/// Skills live in a JSONB list, so this is a full-table scan with an
/// exact membership test in memory. Fine at salon scale; revisit with a GIN
/// index if the staff table ever grows past a few thousand rows.
async fn list_by_skill(
    State(state): State<AppState>,
    Path(skill): Path<String>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<Staff>>, AppError> {
    let all = sqlx::query_as::<_, Staff>(&format!("SELECT {} FROM staff ORDER BY id", COLUMNS))
        .fetch_all(&state.pool)
        .await?;
    let matched: Vec<Staff> = all.into_iter().filter(|s| s.has_skill(&skill)).collect();
    let total = matched.len() as i64;
    let items = matched
        .into_iter()
        .skip(p.skip.max(0) as usize)
        .take(p.limit.max(0) as usize)
        .collect();
    Ok(Json(Page { items, total }))
}
