use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use casira_connect::config::{Cli, Config};
use casira_connect::db;
use casira_connect::routes;
use casira_connect::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    // Initialize database
    let pool = match (config.database.in_memory, config.db_path()) {
        (false, Some(path)) => {
            tracing::info!("Database: {}", path.display());
            db::create_pool(path)?
        }
        _ => {
            tracing::warn!("Using in-memory database; data is lost on exit");
            db::create_memory_pool()?
        }
    };
    db::run_migrations(&pool)?;

    if config.database.seed_sample_data {
        db::seed::seed_sample_data(&pool, config.auth.bcrypt_cost).await?;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Build app state and router
    let state = AppState::new(pool, config);
    let app = routes::app(state);

    // Start server
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
