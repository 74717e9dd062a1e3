/*
 * Responsibility
 * - Config読み込み → CORS policy 組み立て → Router 組み立て
 * - Middleware の適用 (CORS / HTTP)
 * - axum::serve() で起動
 */
use std::{panic, process};

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, cors::SmartCors};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,smartcors=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env().map_err(|err| {
        tracing::error!(error = %err, "failed to load configuration");
        AppError::from(err)
    })?;

    init_panic_hook(!config.environment.app_env.is_production());

    tracing::info!(
        "starting smartcors in {:?} mode on {}",
        config.environment.app_env,
        config.addr
    );

    let cors = SmartCors::new(&config.cors_options(), &config.environment);
    let app = build_router(&cors);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, addr = %config.addr, "failed to bind");
            AppError::Internal
        })?;
    axum::serve(listener, app)
        .await
        .map_err(|_| AppError::Internal)?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub fn build_router(cors: &SmartCors) -> Router {
    let router = Router::new().route("/health", get(health));
    let router = middleware::cors::apply(router, cors);
    middleware::http::apply(router)
}
