//! HTTP surface of the ledger.

pub mod dto;
pub mod error;
mod handlers;
mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{delete, get, post, put};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::application::LedgerService;
use crate::notify::LiveFeed;

pub use error::{ApiError, ApiResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub feed: LiveFeed,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerService>, feed: LiveFeed) -> Self {
        Self { ledger, feed }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Deposits & withdrawals
        .route("/transactions", get(handlers::list_transactions))
        .route("/transactions/stats", get(handlers::transaction_stats))
        .route("/transactions/depot", post(handlers::deposit))
        .route("/transactions/retrait", post(handlers::withdraw))
        .route(
            "/transactions/annuler/:transaction_id",
            post(handlers::cancel_transaction),
        )
        // Transfers
        .route("/transferts", post(handlers::create_transfer))
        .route("/transferts/:id/cancel", post(handlers::cancel_transfer))
        .route("/transferts/:id/resend", get(handlers::resend_transfer))
        .route(
            "/transferts/history/:compte_id",
            get(handlers::transfer_history),
        )
        // Payments
        .route("/paiements", post(handlers::create_payment))
        .route("/paiements/:id", get(handlers::get_payment))
        .route(
            "/paiements/client/:compte_id",
            get(handlers::payment_history),
        )
        // Wallets
        .route("/portefeuilles/:compte_id", get(handlers::get_wallet))
        // Notifications. `:id` is an account id on GET and a notification id
        // on PUT and DELETE.
        .route(
            "/notifications/:id",
            get(handlers::list_notifications).delete(handlers::delete_notification),
        )
        .route(
            "/notifications/:id/read",
            put(handlers::mark_notification_read),
        )
        .route(
            "/notifications/compte/:compte_id/read-all",
            put(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/compte/:compte_id/read",
            delete(handlers::delete_read_notifications),
        )
        .route("/ws/:compte_id", get(websocket::notifications_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
