//! Schema bootstrap: enum types, tables, uniqueness indexes, foreign keys.
//!
//! Idempotent: tables and indexes use IF NOT EXISTS; enum type creation
//! ignores the already-exists error. Foreign keys are ON DELETE RESTRICT, so
//! deleting a referenced row surfaces as a conflict instead of silently
//! orphaning or cascading.

use crate::error::AppError;
use sqlx::PgPool;

const ENUM_TYPES: &[(&str, &[&str])] = &[
    ("appointment_status", &["upcoming", "completed", "cancelled"]),
    ("customer_type", &["standard", "vip"]),
];

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        phone TEXT NOT NULL UNIQUE,
        email TEXT,
        "type" customer_type NOT NULL DEFAULT 'standard',
        preferences JSONB,
        loyalty_points INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS staff (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        skills JSONB,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS service_categories (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS services (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        price DOUBLE PRECISION NOT NULL CHECK (price > 0),
        duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
        description TEXT,
        category_id INTEGER REFERENCES service_categories(id) ON DELETE RESTRICT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id SERIAL PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE RESTRICT,
        service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE RESTRICT,
        staff_id INTEGER REFERENCES staff(id) ON DELETE RESTRICT,
        appointment_time TIMESTAMPTZ NOT NULL,
        status appointment_status NOT NULL DEFAULT 'upcoming',
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feedback (
        id SERIAL PRIMARY KEY,
        appointment_id INTEGER NOT NULL UNIQUE REFERENCES appointments(id) ON DELETE RESTRICT,
        customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE RESTRICT,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comments TEXT,
        sentiment_score DOUBLE PRECISION,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS promotions (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        discount_percent DOUBLE PRECISION NOT NULL CHECK (discount_percent > 0 AND discount_percent <= 100),
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ,
        service_id INTEGER REFERENCES services(id) ON DELETE RESTRICT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS knowledge_base (
        id SERIAL PRIMARY KEY,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        category TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )
    "#,
];

// Email uniqueness applies only when an email is present; any number of
// customers may have no email at all.
const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS customers_email_key ON customers (email) WHERE email IS NOT NULL",
    "CREATE INDEX IF NOT EXISTS appointments_time_idx ON appointments (appointment_time)",
    "CREATE INDEX IF NOT EXISTS appointments_customer_idx ON appointments (customer_id)",
];

/// Create everything the service needs. Safe to run on every startup.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for (name, values) in ENUM_TYPES {
        let vals: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
        let sql = format!("CREATE TYPE {} AS ENUM ({})", name, vals.join(", "));
        // Fails with "already exists" on every run after the first.
        let _ = sqlx::query(&sql).execute(pool).await;
    }
    for ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    for idx in INDEXES {
        sqlx::query(idx).execute(pool).await?;
    }
    tracing::info!("schema migrations applied");
    Ok(())
}
