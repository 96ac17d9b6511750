use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub accelerator_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub version: String,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.model().status();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            model_loaded: status.is_ready(),
            accelerator_available: state.accelerator_available,
            device: status.device.map(|d| d.as_str().to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
