//! # Server Configuration
//!
//! This module contains the router, shared state and OpenAPI document for the
//! attribution API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::attribution::{Aggregator, Linker};
use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub linker: Linker,
    pub aggregator: Aggregator,
}

impl AppState {
    /// Wire the linker and aggregator from configuration
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Self {
        let linker = Linker::new(db.clone(), config.attribution.link_options());
        let aggregator = Aggregator::new(db.clone(), linker.clone());
        Self {
            config,
            db,
            linker,
            aggregator,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route(
            "/reports/revenue",
            get(handlers::reports::revenue_report),
        )
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/orders/{id}/attributions",
            post(handlers::orders::link_order).get(handlers::orders::get_order_attributions),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Starts the server and serves until `shutdown` is cancelled or Ctrl-C arrives
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let profile = config.profile.clone();
    let state = AppState::new(Arc::new(config), db);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %profile, "attribution API listening");

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            ctrl_c.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::reports::revenue_report,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::link_order,
        crate::handlers::orders::get_order_attributions,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::AttributionModel,
            crate::attribution::GroupBy,
            crate::handlers::HealthStatus,
            crate::handlers::reports::RevenueReport,
            crate::handlers::orders::AttributionInfo,
            crate::handlers::orders::OrderAttributions,
            crate::handlers::orders::TouchpointInfo,
            crate::handlers::orders::AttributedTouchpoint,
            crate::handlers::orders::OrderInfo,
            crate::handlers::orders::OrderItemInfo,
            crate::handlers::orders::OrderSummary,
            crate::handlers::orders::Pagination,
            crate::handlers::orders::OrderPage,
            crate::handlers::orders::OrderDetail,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service information"),
        (name = "health", description = "Liveness and readiness probes"),
        (name = "reports", description = "Attributed revenue reports"),
        (name = "orders", description = "Orders, attribution paths and linking")
    ),
    info(
        title = "Attribution API",
        description = "Links orders to marketing touchpoints and reports attributed revenue",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
