use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use worldforge_common::Config;

mod auth;
mod rest;
mod store;

use store::WorldFileStore;

pub struct AppState {
    pub config: Config,
    pub store: WorldFileStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("worldforge=info".parse()?))
        .init();

    let config = Config::from_env();
    let state = Arc::new(AppState {
        store: WorldFileStore::new(config.saves_root.clone()),
        config: config.clone(),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Sessions
        .route("/auth/login", post(auth::api_login))
        .route("/auth/logout", post(auth::api_logout))
        // Drive proxy
        .route("/drive/save", post(rest::drive::api_save))
        .route("/drive/load", post(rest::drive::api_load))
        .route("/drive/list", post(rest::drive::api_list))
        .route("/drive/upload", post(rest::drive::api_upload))
        .route("/drive/upload-image", post(rest::drive::api_upload_image))
        // Per-user world files
        .route("/user/worlds", get(rest::worlds::api_list))
        .route(
            "/user/worlds/{filename}",
            get(rest::worlds::api_load)
                .post(rest::worlds::api_save)
                .delete(rest::worlds::api_delete),
        )
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("WorldForge API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
