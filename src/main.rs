// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use classroom::config::Config;
use classroom::routes;
use classroom::state::AppState;
use classroom::store::{PgStore, SharedStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store = connect_with_retry(&config).await?;

    tracing::info!("Running migrations...");
    store.migrate().await?;
    tracing::info!("Migrations applied successfully.");

    let store: SharedStore = Arc::new(store);

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_with_retry(config: &Config) -> Result<PgStore, sqlx::Error> {
    let mut attempt = 0;
    loop {
        match PgStore::connect(&config.database_url, config.db_timeout).await {
            Ok(store) => {
                tracing::info!("Database connected...");
                return Ok(store);
            }
            Err(e) => {
                attempt += 1;
                if attempt > CONNECT_RETRIES {
                    tracing::error!(
                        "Failed to connect to database after {} retries: {}",
                        CONNECT_RETRIES,
                        e
                    );
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", attempt);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
