use std::sync::Arc;

use anyhow::Context;
use bakery_shop_api::{
    db::{create_pool, run_migrations},
    seed::{SeedAccounts, seed_store},
    store::{DynStore, PgStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = create_pool(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let store: DynStore = Arc::new(PgStore::new(pool));
    let report = seed_store(&store, &SeedAccounts::from_env()).await?;

    println!(
        "Seed completed. Users created: {}, products created: {}",
        report.users_created, report.products_created
    );
    Ok(())
}
