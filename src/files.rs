//! HTTP surface for the workspace store.
//!
//! Five endpoints under `/files`: save, list, load, delete, mkdir. Every
//! handler authorizes the caller's bearer token against the team registry
//! before touching the store; non-members get 403, unknown teams 404, and
//! rejected paths or missing fields 400.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{FileMeta, StoreError, WorkspaceStore};
use crate::teams::{AuthError, TeamRegistry};

/// Shared state for file handlers.
#[derive(Clone)]
pub struct FileApiState {
    pub store: WorkspaceStore,
    pub registry: Arc<TeamRegistry>,
}

/// Error surfaced by the file API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Io(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UnknownTeam(team) => ApiError::NotFound(format!("team {}", team)),
            AuthError::NotAMember(_) | AuthError::BadToken => ApiError::Forbidden(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(path) => ApiError::NotFound(format!("file {}", path)),
            StoreError::InvalidPath(e) => ApiError::Validation(e.to_string()),
            StoreError::Io(e) => ApiError::Io(e.to_string()),
        }
    }
}

/// Pull the bearer token out of the Authorization header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequest {
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileResponse {
    pub message: String,
    pub file_name: String,
    pub team_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    pub files: Vec<FileMeta>,
    pub team_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFileResponse {
    pub content: String,
    pub file_name: String,
    pub last_modified: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResponse {
    pub message: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeDirRequest {
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub dir_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeDirResponse {
    pub message: String,
    pub dir_name: String,
    pub team_name: String,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        Err(ApiError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// POST /files/save
async fn save_file(
    State(state): State<FileApiState>,
    headers: HeaderMap,
    Json(req): Json<SaveFileRequest>,
) -> Result<Json<SaveFileResponse>, ApiError> {
    require("teamId", &req.team_id)?;
    require("fileName", &req.file_name)?;
    let team_name = state
        .registry
        .authorize(bearer_token(&headers), &req.team_id)
        .await?;

    state
        .store
        .write(&team_name, &req.file_name, &req.content)
        .await?;

    info!(team = %req.team_id, file = %req.file_name, "file saved");
    Ok(Json(SaveFileResponse {
        message: "File saved".to_string(),
        file_name: req.file_name,
        team_name,
    }))
}

/// GET /files/team/:team_id/files
async fn list_files(
    State(state): State<FileApiState>,
    headers: HeaderMap,
    Path(team_id): Path<String>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    let team_name = state
        .registry
        .authorize(bearer_token(&headers), &team_id)
        .await?;

    let files = state.store.list(&team_name).await?;
    Ok(Json(ListFilesResponse { files, team_name }))
}

/// GET /files/team/:team_id/file/*file_name
async fn load_file(
    State(state): State<FileApiState>,
    headers: HeaderMap,
    Path((team_id, file_name)): Path<(String, String)>,
) -> Result<Json<LoadFileResponse>, ApiError> {
    require("fileName", &file_name)?;
    let team_name = state
        .registry
        .authorize(bearer_token(&headers), &team_id)
        .await?;

    let file = state.store.read(&team_name, &file_name).await?;
    Ok(Json(LoadFileResponse {
        content: file.content,
        file_name,
        last_modified: file.last_modified,
    }))
}

/// DELETE /files/team/:team_id/file/*file_name
async fn delete_file(
    State(state): State<FileApiState>,
    headers: HeaderMap,
    Path((team_id, file_name)): Path<(String, String)>,
) -> Result<Json<DeleteFileResponse>, ApiError> {
    require("fileName", &file_name)?;
    let team_name = state
        .registry
        .authorize(bearer_token(&headers), &team_id)
        .await?;

    state.store.remove(&team_name, &file_name).await?;
    info!(team = %team_id, file = %file_name, "file deleted");
    Ok(Json(DeleteFileResponse {
        message: "File deleted".to_string(),
        file_name,
    }))
}

/// POST /files/directory
async fn make_directory(
    State(state): State<FileApiState>,
    headers: HeaderMap,
    Json(req): Json<MakeDirRequest>,
) -> Result<Json<MakeDirResponse>, ApiError> {
    require("teamId", &req.team_id)?;
    require("dirName", &req.dir_name)?;
    let team_name = state
        .registry
        .authorize(bearer_token(&headers), &req.team_id)
        .await?;

    if let Err(e) = state.store.mkdir(&team_name, &req.dir_name).await {
        warn!(team = %req.team_id, dir = %req.dir_name, "mkdir failed: {}", e);
        return Err(e.into());
    }

    Ok(Json(MakeDirResponse {
        message: "Directory created".to_string(),
        dir_name: req.dir_name,
        team_name,
    }))
}

/// Create the file API router.
pub fn router(store: WorkspaceStore, registry: Arc<TeamRegistry>) -> Router {
    let state = FileApiState { store, registry };

    Router::new()
        .route("/files/save", post(save_file))
        .route("/files/directory", post(make_directory))
        .route("/files/team/:team_id/files", get(list_files))
        .route(
            "/files/team/:team_id/file/*file_name",
            get(load_file).delete(delete_file),
        )
        .with_state(state)
}
