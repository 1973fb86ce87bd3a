use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

const SCHEMA: &str = include_str!("../schema/attendance.sql");

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Applies the bundled schema. Every statement is `CREATE TABLE IF NOT
/// EXISTS`, so this is safe on every start.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<()> {
    for statement in schema_statements(SCHEMA) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to apply schema statement: {statement}"))?;
    }
    Ok(())
}

fn schema_statements(schema: &str) -> impl Iterator<Item = &str> {
    schema
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.lines().all(|l| l.trim_start().starts_with("--")))
}
