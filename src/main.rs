use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coffee_shop_api::app::{app, AppState};
use coffee_shop_api::auth::{Authorizer, RemoteKeySet};
use coffee_shop_api::config::AppConfig;
use coffee_shop_api::database::{self, PgDrinkStore};

#[derive(Parser)]
#[command(name = "coffee-shop-api")]
#[command(about = "Coffee shop drinks API")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides API_PORT / PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Drop and recreate the drinks table before serving")]
    reset_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH0_DOMAIN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    if cli.reset_db {
        config.database.reset_on_start = true;
    }
    info!("Starting coffee shop API in {:?} mode", config.environment);

    let pool = database::connect(&config.database).context("failed to configure database pool")?;
    let store = PgDrinkStore::new(pool);
    if config.database.reset_on_start {
        store.reset().await.context("failed to reset drinks table")?;
    } else if let Err(e) = store.ensure_schema().await {
        warn!("Could not ensure drinks table exists: {}", e);
    }

    let keys = RemoteKeySet::new(
        config.auth.jwks_url()?,
        Duration::from_secs(config.auth.jwks_cache_secs),
    );
    let authorizer = Authorizer::from_config(Arc::new(keys), &config.auth)?;
    info!(
        "Verifying tokens for audience '{}' issued by {}",
        config.auth.audience,
        config.auth.issuer()?
    );

    let app = app(AppState::new(Arc::new(store)), authorizer, &config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Coffee shop API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
