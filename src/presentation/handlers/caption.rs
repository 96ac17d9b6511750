use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;

use crate::application::services::ServiceError;
use crate::domain::AudioAsset;
use crate::infrastructure::observability::sanitize_for_log;
use crate::presentation::state::AppState;

const FILE_FIELDS: [&str; 2] = ["file", "audio_file"];
const TAG_FIELDS: [&str; 2] = ["tag", "industry"];

#[derive(Serialize)]
pub struct CaptionResponse {
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

struct Upload {
    asset: Option<AudioAsset>,
    tag: Option<String>,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn caption_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    if !state.caption_service.is_ready() {
        return service_error_response(ServiceError::ModelNotReady);
    }

    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    let Some(asset) = upload.asset else {
        tracing::warn!("Caption request with no file");
        return error_response(StatusCode::BAD_REQUEST, "bad_request", "No file uploaded");
    };

    tracing::info!(
        filename = %asset.filename.as_deref().map(sanitize_for_log).unwrap_or_default(),
        content_type = %asset.content_type,
        bytes = asset.size_bytes(),
        tag = %upload.tag.as_deref().map(sanitize_for_log).unwrap_or_default(),
        "Processing audio upload"
    );

    match state.caption_service.caption(asset, upload.tag).await {
        Ok(result) => (
            StatusCode::OK,
            Json(CaptionResponse {
                caption: result.caption,
                tag: result.tag,
                status: "success".to_string(),
            }),
        )
            .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, Response> {
    let mut upload = Upload {
        asset: None,
        tag: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read multipart");
                return Err(error_response(
                    e.status(),
                    "bad_request",
                    &format!("Failed to read multipart: {}", e.body_text()),
                ));
            }
        };

        let name = field.name().unwrap_or_default().to_string();

        if FILE_FIELDS.contains(&name.as_str()) && upload.asset.is_none() {
            let filename = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            let data: Bytes = field.bytes().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to read file bytes");
                error_response(
                    e.status(),
                    "bad_request",
                    &format!("Failed to read file: {}", e.body_text()),
                )
            })?;

            let mut asset = AudioAsset::new(data, content_type);
            if let Some(filename) = filename {
                asset = asset.with_filename(filename);
            }
            upload.asset = Some(asset);
        } else if TAG_FIELDS.contains(&name.as_str()) {
            let text = field.text().await.map_err(|e| {
                error_response(
                    e.status(),
                    "bad_request",
                    &format!("Failed to read field '{}': {}", name, e.body_text()),
                )
            })?;
            let text = text.trim();
            if !text.is_empty() {
                upload.tag = Some(text.to_string());
            }
        } else {
            tracing::debug!(field = %name, "Ignoring unexpected multipart field");
        }
    }

    Ok(upload)
}

fn service_error_response(error: ServiceError) -> Response {
    let (status, kind) = match &error {
        ServiceError::ModelNotReady => (StatusCode::SERVICE_UNAVAILABLE, "model_not_ready"),
        ServiceError::InvalidAudio(_) => (StatusCode::BAD_REQUEST, "invalid_audio"),
        ServiceError::GenerationFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed")
        }
        ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status.is_server_error() {
        tracing::error!(error = %error, status = status.as_u16(), "Caption request failed");
    } else {
        tracing::warn!(error = %error, status = status.as_u16(), "Caption request rejected");
    }

    error_response(status, kind, &error.client_message())
}

fn error_response(status: StatusCode, kind: &str, detail: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: kind.to_string(),
            detail: detail.to_string(),
        }),
    )
        .into_response()
}
