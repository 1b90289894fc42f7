mod config;
mod error;
mod game;
mod protocol;
mod reward;
mod server;

use axum::{routing::get, Router};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::game::engine;
use crate::reward::{LogLedger, RewardLedger};
use crate::server::ws;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cfg = Arc::new(Config::load());
    let world = engine::create_world((*cfg).clone());
    let registry = engine::create_registry();
    let ledger: Arc<dyn RewardLedger> = Arc::new(LogLedger);
    info!(
        width = cfg.world_width,
        height = cfg.world_height,
        tick_rate = cfg.tick_rate,
        "game world created"
    );

    tokio::spawn(engine::game_loop(
        world.clone(),
        registry.clone(),
        ledger,
        cfg.clone(),
    ));

    let ws_state = ws::WsState {
        world,
        registry,
        cfg: cfg.clone(),
        next_session_id: Arc::new(AtomicU64::new(0)),
    };

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(ws_state)
        .fallback_service(ServeDir::new("client"));

    let addr = format!("0.0.0.0:{}", cfg.port);
    info!(%addr, "arena server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
