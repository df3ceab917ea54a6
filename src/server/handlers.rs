use crate::core::error::IntakeError;
use crate::core::multipart::FilePart;
use crate::core::submission::UploadRequest;
use crate::server::types::{AppState, ErrorResponse, UploadResponse};
use crate::utils::constants::PRESCRIPTION_FILE_FIELD;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, http::StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

// server status handler
pub async fn server_status_handler() -> Json<Value> {
    Json(json!({"status": "running"}))
}

pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed_handler() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method Not Allowed"})),
    )
        .into_response()
}

pub fn error_response(error: &IntakeError, file_url: Option<String>) -> Response {
    tracing::error!("Error in upload process: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error.client_message().to_string(),
            details: Some(error.to_string()),
            file_url,
        }),
    )
        .into_response()
}

/// Rewrites the bare replies of the body-limit and timeout layers into the
/// same `500 {error, details}` shape the upload handler uses.
pub async fn failure_as_json(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => error_response(&IntakeError::BodyTooLarge, None),
        StatusCode::REQUEST_TIMEOUT => error_response(&IntakeError::TimedOut, None),
        _ => response,
    }
}

// prescription upload / consultation request handler
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start_time = std::time::Instant::now();

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return error_response(&IntakeError::FormParse(rejection.body_text()), None);
        }
    };

    // held until the response is built so buffered files stay bounded
    let _permit = match state.intake.upload_permit().await {
        Ok(permit) => permit,
        Err(e) => return error_response(&e, None),
    };

    let request = match read_form(multipart, state.config.max_upload_bytes).await {
        Ok(request) => request,
        Err(e) => return error_response(&e, None),
    };

    match state.intake.submit(request).await {
        Ok(outcome) => {
            tracing::info!("Total upload handler time: {:?}", start_time.elapsed());
            (
                StatusCode::OK,
                Json(UploadResponse {
                    success: true,
                    message: outcome.message,
                    file_url: outcome.file.map(|f| f.url),
                }),
            )
                .into_response()
        }
        Err(failure) => error_response(&failure.error, failure.stored_file.map(|f| f.url)),
    }
}

async fn read_form(mut multipart: Multipart, max_file_bytes: usize) -> Result<UploadRequest, IntakeError> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IntakeError::FormParse(e.body_text()))?
    {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };

        if name == PRESCRIPTION_FILE_FIELD {
            file = Some(read_file_field(field, max_file_bytes).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| IntakeError::FormParse(e.body_text()))?;
            fields.insert(name, value);
        }
    }

    UploadRequest::from_form(fields, file)
}

async fn read_file_field(mut field: Field<'_>, max_file_bytes: usize) -> Result<FilePart, IntakeError> {
    let file_name = field
        .file_name()
        .map(String::from)
        .unwrap_or_else(|| "prescription".to_string());
    let content_type = field
        .content_type()
        .map(String::from)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let read_start = std::time::Instant::now();
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| IntakeError::FormParse(e.body_text()))?
    {
        if bytes.len() + chunk.len() > max_file_bytes {
            return Err(IntakeError::FormParse(format!(
                "file exceeds the {} byte limit",
                max_file_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    tracing::info!(
        file_name = %file_name,
        content_type = %content_type,
        "Total file size: {} bytes, read in {:?}",
        bytes.len(),
        read_start.elapsed()
    );

    Ok(FilePart::new(file_name, content_type, bytes))
}
