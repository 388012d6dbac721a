use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub schema: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// Identity provider used to resolve bearer tokens into users.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            schema: std::env::var("DB_SCHEMA").unwrap_or_else(|_| "core".into()),
            max_connections: parse_env("DB_MAX_CONNECTIONS").unwrap_or(10),
            run_migrations: parse_env("RUN_MIGRATIONS").unwrap_or(true),
        };
        let auth = AuthConfig {
            url: std::env::var("AUTH_URL").context("AUTH_URL is not set")?,
            api_key: std::env::var("AUTH_API_KEY").context("AUTH_API_KEY is not set")?,
            timeout_secs: parse_env("AUTH_TIMEOUT_SECS").unwrap_or(10),
        };
        Ok(Self {
            database,
            auth,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("APP_PORT").unwrap_or(8080),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
