use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bakery_shop_api::{
    config::{AppConfig, StoreBackend},
    db::open_store,
    routes::create_app,
    seed::{SeedAccounts, seed_store},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bakery_shop_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;
    tracing::info!(backend = store.backend(), "store ready");

    // Postgres is seeded with the seed binary; the memory store starts empty.
    if config.backend == StoreBackend::Memory {
        let report = seed_store(&store, &SeedAccounts::from_env()).await?;
        tracing::info!(
            users = report.users_created,
            products = report.products_created,
            "seed data loaded"
        );
    }

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let app = create_app(AppState::new(store, config));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
