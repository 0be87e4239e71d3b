pub mod api;

use crate::cache::QueryCache;
use crate::fetch::HttpClient;
use crate::sales::SalesFetcher;
use axum::{Router, http::Method, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
pub struct AppState<C> {
    pub fetcher: Arc<SalesFetcher<C>>,
    pub cache: Arc<QueryCache>,
}

impl<C> AppState<C> {
    pub fn new(fetcher: SalesFetcher<C>, cache: Arc<QueryCache>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            cache,
        }
    }
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            cache: self.cache.clone(),
        }
    }
}

/// Builds the router with every route registered.
pub fn router<C: HttpClient + 'static>(state: AppState<C>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/srt", get(api::sales_handler::<C>))
        .route("/api/srt/chart", get(api::chart_handler::<C>))
        .route("/health", get(api::health_handler::<C>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the axum server and runs until Ctrl+C.
pub async fn serve<C: HttpClient + 'static>(state: AppState<C>, port: u16) -> anyhow::Result<()> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET /api/srt?startDate=2024-06-01&endDate=2024-08-31");
    tracing::info!("  GET /api/srt/chart?startDate=..&endDate=..&station=..&route=..");
    tracing::info!("  GET /health");

    let cache = state.cache.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let dropped = cache.clear().await;
    tracing::info!(dropped, "Server stopped, query cache cleared");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
