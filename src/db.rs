//! Pool construction and database bootstrap.

use crate::config::Config;
use crate::error::AppError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Connect a pool sized from config.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Create the target database if it is missing. CREATE DATABASE cannot run
/// inside the database being created, so this dials the server's default
/// `postgres` database first. Run once at startup, before [`connect`].
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_admin_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Config(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)",
    )
    .bind(&db_name)
    .fetch_one(&mut conn)
    .await?;
    if !exists {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Trivial connectivity probe, used by /health.
pub async fn ping(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").fetch_optional(pool).await?;
    Ok(())
}

/// Split a connection URL into (same URL pointed at `postgres`, database name).
/// The database name is the final path segment, minus any query string.
fn split_admin_url(url: &str) -> Result<(String, String), AppError> {
    let slash = url
        .rfind('/')
        .ok_or_else(|| AppError::Config("DATABASE_URL: no database path".into()))?;
    let tail = url.get(slash + 1..).unwrap_or("");
    let db_name = tail.split('?').next().unwrap_or("").trim().to_string();
    let admin_url = format!("{}postgres", url.get(..slash + 1).unwrap_or(url));
    Ok((admin_url, db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_name_is_last_path_segment() {
        let (admin, name) = split_admin_url("postgres://user:pw@localhost:5432/salon").unwrap();
        assert_eq!(name, "salon");
        assert_eq!(admin, "postgres://user:pw@localhost:5432/postgres");
    }

    #[test]
    fn query_string_is_stripped_from_db_name() {
        let (_, name) = split_admin_url("postgres://localhost/salon?sslmode=require").unwrap();
        assert_eq!(name, "salon");
    }
}
