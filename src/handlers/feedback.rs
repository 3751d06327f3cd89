//! Feedback CRUD, per-appointment lookup, and the average-rating aggregate.
//! At most one feedback row per appointment.

use super::default_limit;
use crate::error::AppError;
use crate::models::Feedback;
use crate::response::{Message, Page};
use crate::schemas::{FeedbackCreate, FeedbackUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str =
    "id, appointment_id, customer_id, rating, comments, sentiment_score, created_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats/average", get(average_rating))
        .route("/appointment/:appointment_id", get(get_by_appointment))
        .route("/:id", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub customer_id: Option<i32>,
    pub appointment_id: Option<i32>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &FeedbackListParams) {
    qb.push(" WHERE TRUE");
    if let Some(customer) = p.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer);
    }
    if let Some(appointment) = p.appointment_id {
        qb.push(" AND appointment_id = ").push_bind(appointment);
    }
    if let Some(min) = p.min_rating {
        qb.push(" AND rating >= ").push_bind(min);
    }
    if let Some(max) = p.max_rating {
        qb.push(" AND rating <= ").push_bind(max);
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<FeedbackListParams>,
) -> Result<Json<Page<Feedback>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM feedback", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q.build_query_as::<Feedback>().fetch_all(&state.pool).await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM feedback");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<FeedbackCreate>,
) -> Result<Json<Feedback>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    let appointment_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM appointments WHERE id = $1)")
            .bind(body.appointment_id)
            .fetch_one(&mut *tx)
            .await?;
    if !appointment_exists {
        return Err(AppError::not_found("appointment"));
    }
    let customer_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
            .bind(body.customer_id)
            .fetch_one(&mut *tx)
            .await?;
    if !customer_exists {
        return Err(AppError::not_found("customer"));
    }
    let already = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM feedback WHERE appointment_id = $1)",
    )
    .bind(body.appointment_id)
    .fetch_one(&mut *tx)
    .await?;
    if already {
        return Err(AppError::Conflict(
            "feedback already exists for this appointment".into(),
        ));
    }
    let row = sqlx::query_as::<_, Feedback>(&format!(
        "INSERT INTO feedback (appointment_id, customer_id, rating, comments, sentiment_score) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        COLUMNS
    ))
    .bind(body.appointment_id)
    .bind(body.customer_id)
    .bind(body.rating)
    .bind(&body.comments)
    .bind(body.sentiment_score)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Option<Feedback>, AppError> {
    let row =
        sqlx::query_as::<_, Feedback>(&format!("SELECT {} FROM feedback WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row)
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Feedback>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let row = fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("feedback"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<FeedbackUpdate>,
) -> Result<Json<Feedback>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    let mut row = fetch(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("feedback"))?;
    body.apply(&mut row);
    let row = sqlx::query_as::<_, Feedback>(&format!(
        "UPDATE feedback SET rating = $1, comments = $2, sentiment_score = $3 \
         WHERE id = $4 RETURNING {}",
        COLUMNS
    ))
    .bind(row.rating)
    .bind(&row.comments)
    .bind(row.sentiment_score)
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
    let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM feedback WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("feedback"));
    }
    Ok(Json(Message::deleted("Feedback")))
}

async fn get_by_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<Feedback>, AppError> {
    let row = sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {} FROM feedback WHERE appointment_id = $1",
        COLUMNS
    ))
    .bind(appointment_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("feedback for this appointment"))?;
    Ok(Json(row))
}

#[derive(Serialize)]
struct AverageRating {
    average_rating: f64,
}

/// 0 on an empty table, never an error.
async fn average_rating(State(state): State<AppState>) -> Result<Json<AverageRating>, AppError> {
    let avg = sqlx::query_scalar::<_, f64>("SELECT COALESCE(AVG(rating), 0)::float8 FROM feedback")
        .fetch_one(&state.pool)
        .await?;
    Ok(Json(AverageRating {
        average_rating: avg,
    }))
}
