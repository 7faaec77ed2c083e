//! REST API and WebSocket server
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Storage health
//! - `GET /api/v1/stats` - Scheduler, hub and storage statistics
//! - `GET /api/v1/monitors` - List monitors
//! - `POST /api/v1/monitors` - Create a monitor and start probing it
//! - `DELETE /api/v1/monitors/:id` - Stop and delete a monitor
//! - `GET /api/v1/monitors/:id/metrics?hours=N` - Metric history and summary
//! - `GET /api/v1/dashboard/stats` - Aggregate status of all monitors
//! - `WS /ws` - Real-time result streaming
//!
//! When an auth token is configured only the `/api/v1` routes require it.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{HealthResponse, MetricsResponse, MonitorsResponse, StatsResponse};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{delete, get},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;

/// Build the router for the given state
pub fn router(config: &ServerConfig, state: ApiState) -> Router {
    let mut api = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route(
            "/api/v1/monitors",
            get(routes::monitors::list_monitors).post(routes::monitors::create_monitor),
        )
        .route("/api/v1/monitors/:id", delete(routes::monitors::delete_monitor))
        .route(
            "/api/v1/monitors/:id/metrics",
            get(routes::monitors::get_monitor_metrics),
        )
        .route(
            "/api/v1/dashboard/stats",
            get(routes::dashboard::get_dashboard_stats),
        );

    if let Some(token) = config.auth_token.as_deref() {
        api = api.route_layer(axum::middleware::from_fn_with_state(
            middleware::auth::ApiToken::new(token),
            middleware::auth::require_api_token,
        ));
    }

    let mut app = api
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// Binds the listener, serves in a background task until `shutdown` is
/// cancelled and returns the bound address with the server's task handle.
pub async fn spawn_api_server(
    config: &ServerConfig,
    state: ApiState,
    shutdown: CancellationToken,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            tracing::error!("API server error: {}", e);
        }
        info!("API server stopped");
    });

    Ok((addr, handle))
}
