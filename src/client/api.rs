//! Client-side workspace backend: the seam between the synchronization
//! engine and the store.
//!
//! The engine is generic over [`WorkspaceBackend`] so tests can substitute a
//! recording backend and count store calls; production uses [`HttpBackend`],
//! a thin reqwest wrapper bound to one server, team, and bearer token.

use crate::store::FileMeta;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Error surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden")]
    Forbidden,
    #[error("validation: {0}")]
    Validation(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("store failure: {0}")]
    Store(String),
}

/// A file loaded from the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedFile {
    pub content: String,
    pub last_modified: u64,
}

/// Store operations the synchronization engine depends on.
pub trait WorkspaceBackend: Send + Sync {
    fn save_file(
        &self,
        path: &str,
        content: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn load_file(&self, path: &str)
        -> impl Future<Output = Result<LoadedFile, ClientError>> + Send;

    fn list_files(&self) -> impl Future<Output = Result<Vec<FileMeta>, ClientError>> + Send;

    fn delete_file(&self, path: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn make_dir(&self, path: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody<'a> {
    team_id: &'a str,
    file_name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MkdirBody<'a> {
    team_id: &'a str,
    dir_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    files: Vec<FileMeta>,
}

/// HTTP implementation of [`WorkspaceBackend`] against the `/files` API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    server: String,
    team_id: String,
    token: String,
}

impl HttpBackend {
    /// Bind a backend to one server, team, and bearer token.
    pub fn new(
        server: impl Into<String>,
        team_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            server: server.into(),
            team_id: team_id.into(),
            token: token.into(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
    }

    /// Map a non-success response onto the client error taxonomy.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            reqwest::StatusCode::NOT_FOUND => ClientError::NotFound(body),
            reqwest::StatusCode::FORBIDDEN => ClientError::Forbidden,
            reqwest::StatusCode::BAD_REQUEST => ClientError::Validation(body),
            _ => ClientError::Store(format!("{}: {}", status, body)),
        })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

impl WorkspaceBackend for HttpBackend {
    async fn save_file(&self, path: &str, content: &str) -> Result<(), ClientError> {
        let url = format!("{}/files/save", self.server);
        let body = SaveBody {
            team_id: &self.team_id,
            file_name: path,
            content,
        };
        let resp = self.auth(self.client.post(&url).json(&body)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn load_file(&self, path: &str) -> Result<LoadedFile, ClientError> {
        let url = format!("{}/files/team/{}/file/{}", self.server, self.team_id, path);
        let resp = self.auth(self.client.get(&url)).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn list_files(&self) -> Result<Vec<FileMeta>, ClientError> {
        let url = format!("{}/files/team/{}/files", self.server, self.team_id);
        let resp = self.auth(self.client.get(&url)).send().await?;
        let resp = Self::check(resp).await?;
        let body: ListBody = resp.json().await?;
        Ok(body.files)
    }

    async fn delete_file(&self, path: &str) -> Result<(), ClientError> {
        let url = format!("{}/files/team/{}/file/{}", self.server, self.team_id, path);
        let resp = self.auth(self.client.delete(&url)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn make_dir(&self, path: &str) -> Result<(), ClientError> {
        let url = format!("{}/files/directory", self.server);
        let body = MkdirBody {
            team_id: &self.team_id,
            dir_name: path,
        };
        let resp = self.auth(self.client.post(&url).json(&body)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}
