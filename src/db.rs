use std::sync::Arc;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    config::{AppConfig, StoreBackend},
    store::{DynStore, MemoryStore, PgStore},
};

pub type DbPool = PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connecting to postgres")?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Opens the configured backend. Postgres is migrated before use.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<DynStore> {
    match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres backend")?;
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => match &config.snapshot_path {
            Some(path) => Ok(Arc::new(MemoryStore::with_snapshot(path).await?)),
            None => Ok(Arc::new(MemoryStore::new())),
        },
    }
}
