//! Customer CRUD, appointment listing, and exact-phone lookup.

use super::{default_limit, PageParams};
use crate::error::AppError;
use crate::models::{Appointment, Customer};
use crate::response::{Message, Page};
use crate::schemas::{CustomerCreate, CustomerUpdate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::types::Json as Jsonb;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const COLUMNS: &str =
    r#"id, name, phone, email, "type", preferences, loyalty_points, created_at, updated_at"#;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/:id/appointments", get(list_appointments))
        .route("/search/phone/:phone", get(find_by_phone))
}

#[derive(Debug, Deserialize)]
pub struct CustomerListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, p: &CustomerListParams) {
    qb.push(" WHERE TRUE");
    if let Some(name) = &p.name {
        qb.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(email) = &p.email {
        qb.push(" AND email ILIKE ").push_bind(format!("%{}%", email));
    }
    if let Some(phone) = &p.phone {
        qb.push(" AND phone ILIKE ").push_bind(format!("%{}%", phone));
    }
}

async fn list(
    State(state): State<AppState>,
    Query(p): Query<CustomerListParams>,
) -> Result<Json<Page<Customer>>, AppError> {
    let mut q = QueryBuilder::new(format!("SELECT {} FROM customers", COLUMNS));
    push_filters(&mut q, &p);
    q.push(" ORDER BY id LIMIT ")
        .push_bind(p.limit)
        .push(" OFFSET ")
        .push_bind(p.skip);
    let items = q.build_query_as::<Customer>().fetch_all(&state.pool).await?;

    let mut c = QueryBuilder::new("SELECT COUNT(*) FROM customers");
    push_filters(&mut c, &p);
    let total = c
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(Page { items, total }))
}

async fn phone_taken(conn: &mut PgConnection, phone: &str) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE phone = $1)")
        .bind(phone)
        .fetch_one(conn)
        .await?;
    Ok(taken)
}

async fn email_taken(conn: &mut PgConnection, email: &str) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE email = $1)")
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(taken)
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CustomerCreate>,
) -> Result<Json<Customer>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    if phone_taken(&mut tx, &body.phone).await? {
        return Err(AppError::Conflict(
            "customer with this phone number already exists".into(),
        ));
    }
    if let Some(email) = &body.email {
        if email_taken(&mut tx, email).await? {
            return Err(AppError::Conflict(
                "customer with this email already exists".into(),
            ));
        }
    }
    let row = sqlx::query_as::<_, Customer>(&format!(
        r#"INSERT INTO customers (name, phone, email, "type", preferences, loyalty_points)
           VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}"#,
        COLUMNS
    ))
    .bind(&body.name)
    .bind(&body.phone)
    .bind(&body.email)
    .bind(body.customer_type)
    .bind(body.preferences.clone().map(Jsonb))
    .bind(body.loyalty_points)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Json(row))
}

async fn fetch(conn: &mut PgConnection, id: i32) -> Result<Option<Customer>, AppError> {
    let row = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {} FROM customers WHERE id = $1",
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
) -> Result<Json<Customer>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let row = fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("customer"))?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<CustomerUpdate>,
) -> Result<Json<Customer>, AppError> {
    body.validate()?;
    let mut tx = state.pool.begin().await?;
    let mut row = fetch(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("customer"))?;

    // Uniqueness is rechecked only when the value actually changes.
    if let Some(phone) = &body.phone {
        if *phone != row.phone && phone_taken(&mut tx, phone).await? {
            return Err(AppError::Conflict(
                "customer with this phone number already exists".into(),
            ));
        }
    }
    if let Some(Some(email)) = &body.email {
        if row.email.as_deref() != Some(email) && email_taken(&mut tx, email).await? {
            return Err(AppError::Conflict(
                "customer with this email already exists".into(),
            ));
        }
    }

    body.apply(&mut row);
    let row = sqlx::query_as::<_, Customer>(&format!(
        r#"UPDATE customers
           SET name = $1, phone = $2, email = $3, "type" = $4, preferences = $5,
               loyalty_points = $6, updated_at = NOW()
           WHERE id = $7 RETURNING {}"#,
        COLUMNS
    ))
    .bind(&row.name)
    .bind(&row.phone)
    .bind(&row.email)
    .bind(row.customer_type)
    .bind(&row.preferences)
    .bind(row.loyalty_points)
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
    let deleted = sqlx::query_scalar::<_, i32>("DELETE FROM customers WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if deleted.is_none() {
        return Err(AppError::not_found("customer"));
    }
    Ok(Json(Message::deleted("Customer")))
}

async fn list_appointments(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(p): Query<PageParams>,
) -> Result<Json<Page<Appointment>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    if fetch(&mut conn, id).await?.is_none() {
        return Err(AppError::not_found("customer"));
    }
    let items = sqlx::query_as::<_, Appointment>(
        "SELECT id, customer_id, service_id, staff_id, appointment_time, status, notes, \
         created_at, updated_at FROM appointments WHERE customer_id = $1 \
         ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(id)
    .bind(p.limit)
    .bind(p.skip)
    .fetch_all(&mut *conn)
    .await?;
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments WHERE customer_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(Json(Page { items, total }))
}

async fn find_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<Customer>, AppError> {
    let row = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {} FROM customers WHERE phone = $1",
        COLUMNS
    ))
    .bind(&phone)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("customer"))?;
    Ok(Json(row))
}
