//! Database adapters: connection pool and schema bootstrap.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Idempotent schema (`CREATE ... IF NOT EXISTS`). Not a migration system:
/// it only brings an empty database up to the expected shape.
pub const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "connected to postgres");
    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SCHEMA;

    #[test]
    fn schema_declares_attendee_invariants() {
        assert!(SCHEMA.contains("UNIQUE (event_id, user_id)"));
        assert_eq!(SCHEMA.matches("ON DELETE CASCADE").count(), 3);
        assert!(SCHEMA.contains("email         TEXT NOT NULL UNIQUE"));
    }
}
