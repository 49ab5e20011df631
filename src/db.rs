use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::info;

use crate::config::DbConfig;

pub fn connect_options(cfg: &DbConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.name)
}

pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    info!(host = %cfg.host, database = %cfg.name, "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(connect_options(cfg))
        .await
        .context("connect to database")?;
    info!("database connection ok");
    Ok(pool)
}

/// Every row of the external `main` table, each as a JSON object.
pub async fn fetch_ejemplo(db: &PgPool) -> Result<Vec<serde_json::Value>, sqlx::Error> {
    sqlx::query_scalar::<_, serde_json::Value>("SELECT row_to_json(m) FROM main m")
        .fetch_all(db)
        .await
}
