use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;

use crate::application::uploads::UploadRequest;
use crate::infra::http::error::ApiError;

use super::AdminState;

fn multipart_to_api(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(Some(err.body_text()))
    } else {
        ApiError::bad_request("invalid multipart payload", Some(err.body_text()))
    }
}

/// `file` plus `folder` and `slug` text fields; fields may arrive in any order.
pub async fn upload_file(
    State(state): State<AdminState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut folder = String::new();
    let mut slug = String::new();
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_to_api)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(multipart_to_api)?;
                file = Some((filename, content_type, bytes));
            }
            Some("folder") => folder = field.text().await.map_err(multipart_to_api)?,
            Some("slug") => slug = field.text().await.map_err(multipart_to_api)?,
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request("missing file", None))?;

    let outcome = state
        .uploads
        .upload(UploadRequest {
            folder,
            slug,
            filename,
            content_type,
            bytes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}
