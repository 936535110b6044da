mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use muster_db::Database;
use muster_service::Backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muster=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("MUSTER_DB_PATH").unwrap_or_else(|_| "muster.db".into());
    let host = std::env::var("MUSTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MUSTER_PORT")
        .unwrap_or_else(|_| "10000".into())
        .parse()?;

    // Init database and the shared backend
    let db = Database::open(&PathBuf::from(&db_path))?;
    let backend = Arc::new(Backend::new(db));

    let app = Router::new()
        .route("/users", post(routes::add_user))
        .route("/users", get(routes::list_users))
        .route("/users/{id}", get(routes::get_user))
        .route("/users/{id}", put(routes::update_user))
        .route("/users/{id}", delete(routes::delete_user))
        .route("/events", post(routes::add_event))
        .route("/events", get(routes::list_events))
        .route("/events/{id}", get(routes::get_event))
        .route("/events/{id}", put(routes::update_event))
        .route("/events/{id}", delete(routes::delete_event))
        .with_state(backend)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("muster server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
