//! Arena API Server
//!
//! Authentication server for the Arena game service.
//!
//! Author: arena-dev@gmail.com

use anyhow::Context;
use arena_api::{auth::AuthService, create_router, state::AppState};
use arena_core::config::{load_dotenv, AppConfig, LoggingConfig};
use arena_core::PgUserStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "arena_api={level},arena_core={level},audit=info,tower_http=info",
            level = logging.level
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config() -> arena_core::Result<AppConfig> {
    let config = match std::env::var("ARENA_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = load_dotenv().context("Failed to load .env file")?;
    let config = load_config().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment from .env file");
    }

    if config.auth.uses_development_secret() {
        tracing::warn!("JWT_SECRET is not set; using the development signing secret");
    }

    let store = Arc::new(
        PgUserStore::connect(&config.database)
            .await
            .context("Failed to connect to user store")?,
    );
    let auth = AuthService::from_config(store.clone(), &config.auth);

    let addr = config.server.bind_addr();
    let state = Arc::new(AppState::new(auth));
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Arena API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, draining connections");
            state.set_ready(false);
        })
        .await?;

    store.close().await;
    tracing::info!("Arena API Server stopped");

    Ok(())
}
