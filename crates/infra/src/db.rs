//! Connection pool and schema.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{InfraError, InfraResult, map_sqlx_error};

const SCHEMA: &[(&str, &str)] = &[
    (
        "medicines",
        r#"
        CREATE TABLE IF NOT EXISTS medicines (
            sr_number         INTEGER PRIMARY KEY,
            product_name      TEXT NULL,
            generic_name      TEXT NULL,
            composition       TEXT NULL,
            packet_size       TEXT NULL,
            uses              TEXT NULL,
            transfer_price    REAL NULL,
            storage_condition TEXT NULL
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL,
            order_date TEXT    NOT NULL
        )
        "#,
    ),
    (
        "orders_user_idx",
        "CREATE INDEX IF NOT EXISTS orders_user_idx ON orders (user_id, order_date)",
    ),
    (
        "order_items",
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id   INTEGER NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL,
            quantity   INTEGER NOT NULL CHECK (quantity > 0)
        )
        "#,
    ),
];

/// Open a pool against `url` (created if missing) and apply the schema.
pub async fn connect(url: &str, max_connections: u32) -> InfraResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| map_sqlx_error("parse_url", e))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    migrate(&pool).await?;
    tracing::info!(url, max_connections, "database ready");
    Ok(pool)
}

/// Single-connection in-memory database, kept open for the pool's lifetime.
pub async fn connect_in_memory() -> InfraResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| map_sqlx_error("parse_url", e))?
        .foreign_keys(true);

    // Every in-memory connection is its own database: never recycle the one.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> InfraResult<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl).execute(pool).await.map_err(|e| match map_sqlx_error("migrate", e) {
            InfraError::Database { operation, message } => InfraError::Database {
                operation,
                message: format!("{name}: {message}"),
            },
            other => other,
        })?;
    }
    tracing::debug!(statements = SCHEMA.len(), "schema applied");
    Ok(())
}
