//! Workbook upload and retrieval endpoints.
//!
//! Uploaded workbooks land in the uploads directory under a generated name
//! and are registered in the database; the newest upload becomes the active
//! data source that `/api/excel/active-data` serves.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use super::{ApiError, SharedState};
use crate::auth::Actor;
use crate::excel;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/excel", get(list_registry).post(upload_workbook))
        .route("/api/excel/active-data", get(active_data))
        .route("/api/excel/files", get(list_files))
        .route("/api/excel/download/{file_name}", get(download))
}

async fn list_registry(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let files = state
        .db
        .call(move |db| db.list_excel_files())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(files))
}

async fn upload_workbook(
    State(state): State<SharedState>,
    _actor: Actor,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let uploads_dir = state.uploads_dir.clone();
        let original = file_name.clone();
        let stored_name =
            tokio::task::spawn_blocking(move || excel::save_workbook(&uploads_dir, &original, &bytes))
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))??;

        let record = state
            .db
            .call(move |db| db.insert_excel_file(&file_name, &stored_name))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        tracing::info!("Registered workbook {} as {}", record.file_name, record.stored_name);
        state.notifier.notify(
            "Workbook",
            "file",
            &format!("{} is now the active workbook", record.file_name),
            "blue",
        );
        return Ok((StatusCode::CREATED, Json(record)));
    }
    Err(ApiError::BadRequest("No file in upload".to_string()))
}

/// Rows of the active workbook's first sheet, keyed by header.
async fn active_data(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let active = state
        .db
        .call(move |db| db.active_excel_file())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let file = active.ok_or(crate::errors::ExcelError::NoActiveFile)?;

    let path = excel::stored_file_path(&state.uploads_dir, &file.stored_name)?;
    let rows = tokio::task::spawn_blocking(move || excel::read_rows(&path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(rows))
}

async fn list_files(
    State(state): State<SharedState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let uploads_dir = state.uploads_dir.clone();
    let names = tokio::task::spawn_blocking(move || excel::list_stored(&uploads_dir))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(names))
}

/// Serve a stored workbook back. `file_name` is the on-disk name as listed
/// by `/api/excel/files`; the download keeps the original upload name when
/// the registry still knows it.
async fn download(
    State(state): State<SharedState>,
    _actor: Actor,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = excel::stored_file_path(&state.uploads_dir, &file_name)?;

    let stored = file_name.clone();
    let original = state
        .db
        .call(move |db| {
            Ok(db
                .list_excel_files()?
                .into_iter()
                .find(|f| f.stored_name == stored)
                .map(|f| f.file_name))
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .unwrap_or_else(|| file_name.clone());

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", original),
        ),
    ];
    Ok((headers, bytes))
}
