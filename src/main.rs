use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use helpdesk::core::config::{AppConfig, StoreBackend};
use helpdesk::core::shared::state::AppState;
use helpdesk::core::shared::utils::{create_conn, run_migrations};
use helpdesk::core::store::{HelpdeskStore, MemoryStore, PgHelpdeskStore};
use helpdesk::main_module::{bootstrap_store, run_axum_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn HelpdeskStore> = match config.store {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set for the postgres store"))?;
            let pool = create_conn(url, config.database.pool_size)
                .context("Failed to create database pool")?;
            run_migrations(&pool).map_err(|e| anyhow!("Failed to run migrations: {e}"))?;
            info!(
                "Connected to PostgreSQL (pool size {})",
                config.database.pool_size
            );
            Arc::new(PgHelpdeskStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let bootstrap_store_handle = Arc::clone(&store);
    let bootstrap_config = config.clone();
    tokio::task::spawn_blocking(move || {
        bootstrap_store(bootstrap_store_handle.as_ref(), &bootstrap_config)
    })
    .await
    .context("Bootstrap task panicked")??;

    let app_state = Arc::new(AppState::new(config, store));
    run_axum_server(app_state)
        .await
        .context("HTTP server failed")?;

    info!("Helpdesk stopped");
    Ok(())
}
