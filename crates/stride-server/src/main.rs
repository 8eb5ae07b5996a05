mod middleware;
mod notify;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use routes::AppState;
use stride_db::Database;
use stride_engine::ChallengeEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stride=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("STRIDE_DB_PATH").unwrap_or_else(|_| "stride.db".into());
    let host = std::env::var("STRIDE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("STRIDE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database + engine
    let db = Database::open(&PathBuf::from(&db_path))?;
    let state = AppState {
        engine: Arc::new(ChallengeEngine::new(db)),
    };

    // Routes — everything requires a bearer token
    let app = Router::new()
        .route(
            "/challenges",
            post(routes::create_challenge).get(routes::list_challenges),
        )
        .route("/challenges/{challenge_id}/summary", get(routes::challenge_summary))
        .route("/challenges/{challenge_id}/respond", post(routes::respond_to_challenge))
        .route("/challenges/{challenge_id}/finish", post(routes::request_finish))
        .route(
            "/challenges/{challenge_id}/finish/decline",
            post(routes::decline_finish),
        )
        .route("/challenges/{challenge_id}", delete(routes::delete_challenge))
        .layer(axum_middleware::from_fn(middleware::require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Stride server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
