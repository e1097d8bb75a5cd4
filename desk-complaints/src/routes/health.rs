use axum::Json;
use desk_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("desk-complaints", env!("CARGO_PKG_VERSION")))
}
