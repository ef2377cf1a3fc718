//! # Storefront API Server
//!
//! JSON API for the storefront: catalogue, accounts, sessions and
//! payment intents.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (`.env` honoured)
//! 2. Connect to PostgreSQL and apply pending migrations
//! 3. Connect to Redis
//! 4. Build the service registry, failing fast on missing dependencies
//! 5. Serve until Ctrl-C
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p storefront-api
//! ```

use anyhow::Context;
use chrono::Duration;
use std::{net::SocketAddr, sync::Arc};
use storefront_api::{
    app::{build_router, AppState},
    config::Config,
};
use storefront_shared::{
    auth::{jwt::TokenIssuer, oauth::GoogleOAuth},
    cache::{RedisClient, RedisConfig},
    db::{migrations, pool},
    payments::StripeProvider,
    services::{registry::ServiceDeps, ServiceRegistry},
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "storefront_api=debug,storefront_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Storefront API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let db_config = pool::DatabaseConfig::new(config.database.url.clone())
        .with_max_connections(config.database.max_connections);
    let db = pool::create_pool(db_config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    migrations::run_migrations(&db)
        .await
        .context("Failed to run migrations")?;

    let redis = RedisClient::new(RedisConfig::new(config.redis.url.clone()))
        .await
        .context("Failed to connect to Redis")?;
    if !redis.ping_server().await.context("Redis health check failed")? {
        tracing::warn!("Redis answered PING unexpectedly");
    }

    let tokens = TokenIssuer::new(
        config.jwt.secret.clone(),
        Duration::seconds(config.jwt.access_ttl_secs),
        Duration::seconds(config.jwt.refresh_ttl_secs),
    );

    let mut deps = ServiceDeps::with_store(PgStore::new(db.clone()))
        .cache(Arc::new(redis))
        .tokens(Arc::new(tokens));

    if let Some(google) = &config.google {
        let oauth = GoogleOAuth::new(
            google.client_id.clone(),
            google.client_secret.clone(),
            google.redirect_url.clone(),
        )
        .context("Invalid Google OAuth configuration")?;
        deps = deps.oauth(Arc::new(oauth));
    } else {
        tracing::warn!("Google OAuth not configured, Google sign-in disabled");
    }

    if let Some(stripe) = &config.stripe {
        deps = deps.payments(Arc::new(StripeProvider::new(stripe.secret_key.clone())));
    } else {
        tracing::warn!("Stripe not configured, payment intents disabled");
    }

    let services = ServiceRegistry::new(deps);
    services
        .init_all()
        .context("Failed to initialize services")?;

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(config, Arc::new(services), Some(db.clone())));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
