use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Creates the users table when it is missing. Existing tables are left as is.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id    BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            name  VARCHAR(100) NOT NULL,
            email VARCHAR(100) NOT NULL UNIQUE,
            age   INTEGER,
            role  VARCHAR(50)  NOT NULL DEFAULT 'customer'
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users table")?;
    Ok(())
}
