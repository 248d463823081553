//! Stateless broadcast relay for board sessions.
//!
//! One process hosts any number of board rooms over a single websocket
//! endpoint. The relay validates, fans out, and forgets — document state
//! lives entirely in the participants' replicas.

mod state;
mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::RelayState;

fn app(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/ws", get(ws::handle_ws))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let state = RelayState::new();
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "relay listening");
    axum::serve(listener, app(state)).await.expect("server failed");
}
