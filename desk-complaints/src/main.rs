use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use desk_shared::clients::db::{create_pool, DbPool};
use desk_shared::middleware::{init_metrics, init_tracing, metrics_middleware, PrometheusHandle};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub metrics: PrometheusHandle,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("desk-complaints");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url, 10);
    let metrics = init_metrics();

    let state = Arc::new(AppState { db, config, metrics });

    let admin_routes = Router::new()
        .route("/complaints/unclaimed", get(routes::admin_routes::list_unclaimed))
        .route("/complaints/claimed", get(routes::admin_routes::get_claimed))
        .route("/complaints/:id/claim", post(routes::admin_routes::claim_complaint))
        .route("/complaints/:id/status", put(routes::admin_routes::update_status));

    let super_admin_routes = Router::new()
        .route("/complaints", get(routes::super_admin_routes::list_all));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(metrics_handler))
        .route("/complaints", post(routes::student_routes::create_complaint))
        .route("/complaints/mine", get(routes::student_routes::list_my_complaints))
        .route("/complaints/:id/history", get(routes::student_routes::get_complaint_history))
        .nest("/admin", admin_routes)
        .nest("/super-admin", super_admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "desk-complaints starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
