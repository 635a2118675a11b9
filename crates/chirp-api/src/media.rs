use anyhow::anyhow;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum::http::HeaderMap;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use chirp_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Claims;

/// 5 MB upload limit for images
const MAX_MEDIA_SIZE: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// POST /media — accepts raw image bytes, saves to `{upload_dir}/{id}`,
/// inserts a metadata row, returns `{ mediaId, size }`.
pub async fn upload_media(
    State(state): State<AppState>,
    claims: Claims,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::Validation(
            "only JPEG, PNG, GIF and WEBP images are accepted".into(),
        ));
    }
    if bytes.is_empty() {
        return Err(ApiError::Validation("the upload is empty".into()));
    }
    if bytes.len() > MAX_MEDIA_SIZE {
        return Err(ApiError::Validation("the file is too large, at most 5 MB".into()));
    }

    let media_id = Uuid::new_v4();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(anyhow!("failed to create upload directory: {}", e)))?;

    let file_path = state.upload_dir.join(media_id.to_string());
    let mut file = tokio::fs::File::create(&file_path)
        .await
        .map_err(|e| ApiError::Internal(anyhow!("failed to create {}: {}", file_path.display(), e)))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| ApiError::Internal(anyhow!("failed to write {}: {}", file_path.display(), e)))?;

    let db = state.clone();
    {
        let mid = media_id.to_string();
        let uid = claims.sub.to_string();
        blocking(move || db.db.insert_media(&mid, &uid, &content_type, size)).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            media_id,
            size: size as u64,
        }),
    ))
}

/// GET /media/{id} — reads the stored image back with its content type.
pub async fn download_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // The id must be a valid UUID to prevent path traversal.
    id.parse::<Uuid>()
        .map_err(|_| ApiError::Validation("invalid media id".into()))?;

    let db = state.clone();
    let mid = id.clone();
    let row = blocking(move || db.db.get_media(&mid))
        .await?
        .ok_or_else(|| ApiError::NotFound("media not found".into()))?;

    let file_path = state.upload_dir.join(&row.id);
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|_| ApiError::NotFound("media not found".into()))?;

    Ok(([(header::CONTENT_TYPE, row.content_type)], bytes))
}
