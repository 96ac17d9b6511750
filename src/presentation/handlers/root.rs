use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub status: String,
    pub model_state: String,
}

pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let model = state.model();

    let endpoints = BTreeMap::from([
        ("/health", "Check API and model status"),
        ("/api/process-audio", "Upload an audio file to generate a caption"),
    ]);

    let status = if model.is_ready() {
        "operational"
    } else {
        "model_not_loaded"
    };

    (
        StatusCode::OK,
        Json(RootResponse {
            message: "Welcome to the Audio Captioning API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints,
            status: status.to_string(),
            model_state: model.state().as_str().to_string(),
        }),
    )
}
