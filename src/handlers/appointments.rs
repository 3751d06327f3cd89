//! Appointment CRUD, today's schedule, and the status-only update.
//!
//! Creation always starts an appointment as `upcoming`; the caller cannot
//! choose an initial status. Status transitions are not restricted, matching
//! the documented behavior of the service.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::{Appointment, AppointmentStatus};
use crate::response::{Message, Page};
use crate::schemas::{AppointmentCreate, AppointmentUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str = "id, customer_id, service_id, staff_id, appointment_time, status, notes, \
                       created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/today", get(list_today))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub customer_id: Option<i32>,
    pub service_id: Option<i32>,
    pub staff_id: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &AppointmentListParams) {
    qb.push(" WHERE TRUE");
    if let Some(customer) = p.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer);
    }
    if let Some(service) = p.service_id {
        qb.push(" AND service_id = ").push_bind(service);
    }
    if let Some(staff) = p.staff_id {
        qb.push(" AND staff_id = ").push_bind(staff);
    }
    if let Some(status) = p.status {
        qb.push(" AND status = ").push_bind(status);
    }
    // Inclusive day range on appointment_time.
    if let Some(from) = p.date_from {
        qb.push(" AND appointment_time::date >= ").push_bind(from);
    }
    if let Some(to) = p.date_to {
        qb.push(" AND appointment_time::date <= ").push_bind(to);
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<AppointmentListParams>,
) -> Result<Json<Page<Appointment>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM appointments", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q
        .build_query_as::<Appointment>()
        .fetch_all(&state.pool)
        .await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM appointments");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn assert_exists(
    conn: &mut PgConnection,
    table: &str,
    what: &str,
    id: i32,
) -> Result<(), AppError> {
    let exists =
        sqlx::query_scalar::<_, bool>(&format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table))
            .bind(id)
            .fetch_one(conn)
            .await?;
    if !exists {
        return Err(AppError::not_found(what));
    }
    Ok(())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<AppointmentCreate>,
) -> Result<Json<Appointment>, AppError> {
    let mut tx = state.pool.begin().await?;
    assert_exists(&mut tx, "customers", "customer", body.customer_id).await?;
    assert_exists(&mut tx, "services", "service", body.service_id).await?;
    if let Some(staff) = body.staff_id {
        assert_exists(&mut tx, "staff", "staff member", staff).await?;
    }
    let row = sqlx::query_as::<_, Appointment>(&format!(
        "INSERT INTO appointments (customer_id, service_id, staff_id, appointment_time, status, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        COLUMNS
    ))
    .bind(body.customer_id)
    .bind(body.service_id)
    .bind(body.staff_id)
    .bind(body.appointment_time)
    .bind(AppointmentStatus::Upcoming)
    .bind(&body.notes)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Option<Appointment>, AppError> {
    let row = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Appointment>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let row = fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("appointment"))?;
    Ok(Json(row))
}

async fn write_back(
    conn: &mut PgConnection,
    id: i32,
    row: &Appointment,
) -> Result<Appointment, AppError> {
    let row = sqlx::query_as::<_, Appointment>(&format!(
        "UPDATE appointments SET customer_id = $1, service_id = $2, staff_id = $3, \
         appointment_time = $4, status = $5, notes = $6, updated_at = NOW() \
         WHERE id = $7 RETURNING {}",
        COLUMNS
    ))
    .bind(row.customer_id)
    .bind(row.service_id)
    .bind(row.staff_id)
    .bind(row.appointment_time)
    .bind(row.status)
    .bind(&row.notes)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AppointmentUpdate>,
) -> Result<Json<Appointment>, AppError> {
    let mut tx = state.pool.begin().await?;
    let mut row = fetch(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("appointment"))?;

    if let Some(customer) = body.customer_id {
        assert_exists(&mut tx, "customers", "customer", customer).await?;
    }
    if let Some(service) = body.service_id {
        assert_exists(&mut tx, "services", "service", service).await?;
    }
    if let Some(Some(staff)) = body.staff_id {
        assert_exists(&mut tx, "staff", "staff member", staff).await?;
    }

    body.apply(&mut row);
    let row = write_back(&mut tx, id, &row).await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Message>, AppError> {
    let deleted =
        sqlx::query_scalar::<_, i32>("DELETE FROM appointments WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("appointment"));
    }
    Ok(Json(Message::deleted("Appointment")))
}

async fn list_today(
    State(state): State<AppState>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<Appointment>>, AppError> {
    let items = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments WHERE appointment_time::date = CURRENT_DATE \
         ORDER BY appointment_time LIMIT $1 OFFSET $2",
        COLUMNS
    ))
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&state.pool)
    .await?;
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM appointments WHERE appointment_time::date = CURRENT_DATE",
    )
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(Page { items, total }))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: AppointmentStatus,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(p): Query<StatusParams>,
) -> Result<Json<Appointment>, AppError> {
    let mut tx = state.pool.begin().await?;
    let mut row = fetch(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("appointment"))?;
    row.status = p.status;
    let row = write_back(&mut tx, id, &row).await?;
    tx.commit().await?;
    Ok(Json(row))
}
