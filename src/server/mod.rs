//! JSON HTTP surface over the [`QuestBoard`].

pub mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::quests::QuestBoard;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<QuestBoard>,
}

/// Every board route, ready to be served or driven in tests.
pub fn router(board: Arc<QuestBoard>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/quests",
            get(handlers::list_quests).post(handlers::create_quest),
        )
        .route("/api/quests/reorder", post(handlers::reorder_quests))
        .route("/api/quests/archive", get(handlers::archived_quests))
        .route("/api/quests/{id}/accept", post(handlers::accept_quest))
        .route("/api/quests/{id}/unaccept", post(handlers::unaccept_quest))
        .route("/api/quests/{id}/complete", post(handlers::complete_quest))
        .route("/api/quests/{id}/reopen", post(handlers::reopen_quest))
        .route("/api/achievements", get(handlers::achievements))
        .route("/api/admin/members", get(handlers::pending_members))
        .route("/api/admin/members/{id}", post(handlers::decide_member))
        .route("/api/me", get(handlers::me))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { board })
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(board: Arc<QuestBoard>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "guild board listening");

    axum::serve(listener, router(board))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("guild board shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
