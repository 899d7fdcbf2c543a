mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use wouldyou_api::AppStateInner;
use wouldyou_core::{ChallengeService, GlmGenerator, QuestionGenerator};
use wouldyou_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wouldyou=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("FATAL: {}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let generator = GlmGenerator::new(config.glm.clone())?;
    if generator.is_available() {
        info!("Question generator enabled ({})", generator.model());
    } else {
        warn!("GLM_API_KEY not set, question generation disabled");
    }

    let service = Arc::new(ChallengeService::new(db, generator).with_settings(config.settings.clone()));

    if config.seed_on_startup && service.generator_available() {
        let seeder = service.clone();
        tokio::spawn(async move {
            match seeder.ensure_minimum_challenges().await {
                Ok(added) => info!("Startup top-up added {} challenges", added),
                Err(e) => warn!("Startup top-up failed: {}", e),
            }
        });
    }

    let state = AppStateInner::new(service, config.jwt_secret.clone(), config.request_timeout);
    let app = wouldyou_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Would You server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
