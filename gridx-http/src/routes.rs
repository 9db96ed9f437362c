use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gridx_core::{FileRecord, Stats};

use crate::AppState;
use crate::error::{ApiError, Result};
use crate::transfer::{self, blocking};

const UPLOAD_FIELD: &str = "file";

/// GET / - complete files, oldest first
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>> {
    let vault = state.vault.clone();
    Ok(Json(blocking(move || vault.list()).await?))
}

/// POST / - multipart upload of field `file`
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecord>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name_hint = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let record =
            transfer::store_field(state.vault.clone(), name_hint, content_type, field).await?;
        return Ok((StatusCode::CREATED, Json(record)));
    }
    Err(ApiError::BadRequest(format!(
        "multipart field \"{UPLOAD_FIELD}\" is missing"
    )))
}

/// GET /getfile/{name} - stream by name (or id)
pub async fn get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    transfer::stream_file(state.vault.clone(), name).await
}

/// POST /deleteFile/{id} and DELETE /files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let vault = state.vault.clone();
    blocking(move || vault.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    let vault = state.vault.clone();
    Ok(Json(blocking(move || vault.catalog().stats()).await?))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Page not found!").into_response()
}
