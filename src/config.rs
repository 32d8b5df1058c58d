use std::{env, path::PathBuf, str::FromStr};

use anyhow::Context;

pub const DEFAULT_ADMIN_EMAIL_DOMAIN: &str = "admin.cl";
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
pub const DEFAULT_JWT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Emails under this domain are treated as staff.
    pub admin_email_domain: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub auth: AuthSettings,
    pub low_stock_threshold: i32,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    /// Defaults for everything but the signing secret; in-memory store.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backend: StoreBackend::Memory,
            database_url: None,
            snapshot_path: None,
            auth: AuthSettings {
                jwt_secret: jwt_secret.into(),
                token_ttl_hours: DEFAULT_JWT_TTL_HOURS,
                admin_email_domain: DEFAULT_ADMIN_EMAIL_DOMAIN.to_string(),
            },
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            cors_origin: None,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let mut config = Self::new(jwt_secret);

        if let Ok(host) = env::var("APP_HOST") {
            config.host = host;
        }
        if let Some(port) = env::var("APP_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            config.port = port;
        }

        config.database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        config.backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) if config.database_url.is_some() => StoreBackend::Postgres,
            Err(_) => StoreBackend::Memory,
        };
        if config.backend == StoreBackend::Postgres && config.database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set for the postgres backend");
        }
        config.snapshot_path = env::var("STORE_SNAPSHOT_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if let Some(ttl) = env::var("JWT_TTL_HOURS").ok().and_then(|v| v.parse().ok()) {
            config.auth.token_ttl_hours = ttl;
        }
        if let Ok(domain) = env::var("ADMIN_EMAIL_DOMAIN") {
            config.auth.admin_email_domain = domain.trim().trim_start_matches('@').to_lowercase();
        }
        if let Some(threshold) = env::var("LOW_STOCK_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.low_stock_threshold = threshold;
        }
        config.cors_origin = env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty());

        Ok(config)
    }
}
