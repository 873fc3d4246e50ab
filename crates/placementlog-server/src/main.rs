mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use placementlog_api::{AppStateInner, TokenService, router};
use placementlog_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "placementlog=debug,placementlog_api=debug,placementlog_db=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    let tokens = TokenService::new(&config.jwt_secret).context("invalid signing secret")?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let state = AppStateInner::with_database(tokens, db);

    if let Some(admin) = config.bootstrap_admin.clone() {
        let admins_state = state.clone();
        let created = tokio::task::spawn_blocking(move || {
            admins_state
                .admins
                .ensure_admin(&admin.username, &admin.password)
        })
        .await?
        .context("failed to create bootstrap admin")?;

        if created {
            info!("Bootstrap admin created");
        }
    } else {
        warn!("No bootstrap admin configured; admin routes need an existing account");
    }

    let app = router(state);

    info!("PlacementLog listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
