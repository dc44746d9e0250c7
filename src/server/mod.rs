mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use state::{AppState, SelectionFlag};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/regions", get(handlers::regions))
        .route("/api/nearby", get(handlers::nearby))
        .route("/api/status", get(handlers::status))
        .route("/api/location", post(handlers::update_location))
        .route("/api/refresh", post(handlers::refresh))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Transit regions API listening on http://{}", addr);
    axum::serve(listener, app).await
}
