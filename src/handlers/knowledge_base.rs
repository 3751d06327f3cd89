//! Knowledge-base CRUD, free-text search, and per-category listing.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::KnowledgeBaseEntry;
use crate::response::{Message, Page};
use crate::schemas::{KnowledgeBaseCreate, KnowledgeBaseUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

const COLUMNS: &str = "id, question, answer, category, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/category/:category", get(list_by_category))
        .route("/:id", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub question: Option<String>,
    pub category: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &KnowledgeBaseListParams) {
    qb.push(" WHERE TRUE");
    if let Some(question) = &p.question {
        qb.push(" AND question ILIKE ")
            .push_bind(format!("%{}%", question));
    }
    if let Some(category) = &p.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<KnowledgeBaseListParams>,
) -> Result<Json<Page<KnowledgeBaseEntry>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM knowledge_base", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q
        .build_query_as::<KnowledgeBaseEntry>()
        .fetch_all(&state.pool)
        .await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM knowledge_base");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<KnowledgeBaseCreate>,
) -> Result<Json<KnowledgeBaseEntry>, AppError> {
    let row = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "INSERT INTO knowledge_base (question, answer, category) VALUES ($1, $2, $3) RETURNING {}",
        COLUMNS
    ))
    .bind(&body.question)
    .bind(&body.answer)
    .bind(&body.category)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<KnowledgeBaseEntry>, AppError> {
    let row = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "SELECT {} FROM knowledge_base WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("knowledge base entry"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<KnowledgeBaseUpdate>,
) -> Result<Json<KnowledgeBaseEntry>, AppError> {
    let mut tx = state.pool.begin().await?;
    let mut row = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "SELECT {} FROM knowledge_base WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("knowledge base entry"))?;
    body.apply(&mut row);
    let row = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "UPDATE knowledge_base SET question = $1, answer = $2, category = $3, updated_at = NOW() \
         WHERE id = $4 RETURNING {}",
        COLUMNS
    ))
    .bind(&row.question)
    .bind(&row.answer)
    .bind(&row.category)
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
    let deleted =
        sqlx::query_scalar::<_, i32>("DELETE FROM knowledge_base WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("knowledge base entry"));
    }
    Ok(Json(Message::deleted("Knowledge base entry")))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Case-insensitive substring search over question OR answer.
async fn search(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<Json<Page<KnowledgeBaseEntry>>, AppError> {
    if p.query.is_empty() {
        return Err(AppError::Validation("query must not be empty".into()));
    }
    let pattern = format!("%{}%", p.query);
    let items = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "SELECT {} FROM knowledge_base WHERE question ILIKE $1 OR answer ILIKE $1 \
         ORDER BY id LIMIT $2 OFFSET $3",
        COLUMNS
    ))
    .bind(&pattern)
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&state.pool)
    .await?;
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM knowledge_base WHERE question ILIKE $1 OR answer ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(Page { items, total }))
}

async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<KnowledgeBaseEntry>>, AppError> {
    let items = sqlx::query_as::<_, KnowledgeBaseEntry>(&format!(
        "SELECT {} FROM knowledge_base WHERE category = $1 ORDER BY id LIMIT $2 OFFSET $3",
        COLUMNS
    ))
    .bind(&category)
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&state.pool)
    .await?;
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM knowledge_base WHERE category = $1")
            .bind(&category)
            .fetch_one(&state.pool)
            .await?;
    Ok(Json(Page { items, total }))
}
