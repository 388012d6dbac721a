mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod ingredients;
mod meal_plans;
mod recipes;
mod response;
mod state;
mod types;
mod units;
mod validate;

use crate::{config::AppConfig, db::PgStore, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let store = PgStore::connect(
        &config.database.url,
        &config.database.schema,
        config.database.max_connections,
    )
    .await?;

    if config.database.run_migrations {
        if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    let state = AppState::init(&config, store)?;
    app::serve(app::build_app(state), &config.bind_addr()).await
}
