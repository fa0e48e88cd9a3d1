use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::models::{
    CreateProjectRequest, FileMetadataUpdate, FileStatus, FileUpload, Project,
    UpdateProjectRequest, UploadedFile,
};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    TogglePin,
    ToggleFavorite,
    ToggleShare,
    Archive,
    Unarchive,
    Publish,
    Unpublish,
}

impl ProjectAction {
    /// Accepts the short command names as well as the URL segments.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim() {
            "pin" | "toggle-pin" => ProjectAction::TogglePin,
            "favorite" | "toggle-favorite" => ProjectAction::ToggleFavorite,
            "share" | "toggle-share" => ProjectAction::ToggleShare,
            "archive" => ProjectAction::Archive,
            "unarchive" => ProjectAction::Unarchive,
            "publish" => ProjectAction::Publish,
            "unpublish" => ProjectAction::Unpublish,
            _ => return None,
        })
    }

    pub fn segment(self) -> &'static str {
        match self {
            ProjectAction::TogglePin => "toggle-pin",
            ProjectAction::ToggleFavorite => "toggle-favorite",
            ProjectAction::ToggleShare => "toggle-share",
            ProjectAction::Archive => "archive",
            ProjectAction::Unarchive => "unarchive",
            ProjectAction::Publish => "publish",
            ProjectAction::Unpublish => "unpublish",
        }
    }
}

#[derive(Clone)]
pub struct DocdeskClient {
    http: Client,
    base_url: Url,
    csrf_token: Option<String>,
}

impl DocdeskClient {
    pub fn new(csrf_token: Option<String>) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, csrf_token)
    }

    pub fn with_base_url(base_url: &str, csrf_token: Option<String>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            csrf_token: csrf_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Rebuilds the HTTP client with a whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ApiError> {
        self.http = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let response = self.request(Method::GET, "projects/")?.send().await?;
        Self::handle_response(response).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project, ApiError> {
        let response = self
            .request(Method::GET, &format!("projects/{id}/"))?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_project(&self, payload: &CreateProjectRequest) -> Result<Project, ApiError> {
        let response = self
            .request(Method::POST, "projects/")?
            .json(payload)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn update_project(&self, payload: &UpdateProjectRequest) -> Result<Project, ApiError> {
        let response = self
            .request(Method::PATCH, &format!("projects/{}/", payload.id))?
            .json(payload)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("projects/{id}/"))?
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub async fn project_action(&self, id: &str, action: ProjectAction) -> Result<Project, ApiError> {
        let response = self
            .request(
                Method::PATCH,
                &format!("projects/{id}/{}/", action.segment()),
            )?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_project_files(&self, project_id: &str) -> Result<Vec<UploadedFile>, ApiError> {
        let response = self
            .request(Method::GET, &format!("projects/{project_id}/files/"))?
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_files(&self) -> Result<Vec<UploadedFile>, ApiError> {
        let response = self.request(Method::GET, "files/")?.send().await?;
        Self::handle_response(response).await
    }

    pub async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, ApiError> {
        let mut part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);
        let response = self
            .request(Method::POST, "files/")?
            .multipart(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn attach_file(&self, project_id: &str, file_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &format!("projects/{project_id}/attach-file/"))?
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("files/{file_id}/"))?
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub async fn update_file_metadata(
        &self,
        file_id: &str,
        update: &FileMetadataUpdate,
    ) -> Result<(), ApiError> {
        let response = self
            .request(
                Method::POST,
                &format!("files/{file_id}/update-file-metadata/"),
            )?
            .json(update)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub async fn update_file_status(&self, file_id: &str, status: FileStatus) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, &format!("files/{file_id}/update-file-status/"))?
            .json(&serde_json::json!({ "file_id": file_id, "file_status": status }))
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .request(Method::GET, &format!("files/{file_id}/download/"))?
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        let needs_csrf = method != Method::GET;
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.csrf_token.as_deref().filter(|_| needs_csrf) {
            builder = builder.header(CSRF_HEADER, token);
        }
        Ok(builder)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn handle_empty(response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::Api { status, body }
    }
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Request(err) => err.status(),
            ApiError::Url(_) => None,
        }
    }

    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            ApiError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            Some(ApiErrorClass::RateLimit | ApiErrorClass::Transient)
        )
    }

    /// Short human-readable text for a notification.
    ///
    /// Server-provided `errors` or `message` fields win, then plain
    /// `{"field": ["reason"]}` bodies, then a fixed text per status.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { status, body } => serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|payload| message_from_body(&payload))
                .unwrap_or_else(|| status_message(*status).to_string()),
            ApiError::Request(err) if err.is_timeout() => {
                "Request timed out - Please try again later".to_string()
            }
            _ => "An unexpected error occurred".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    message: Option<String>,
}

fn message_from_body(payload: &Value) -> Option<String> {
    if let Ok(envelope) = serde_json::from_value::<ErrorEnvelope>(payload.clone()) {
        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let joined = errors
                .values()
                .flat_map(flatten_messages)
                .collect::<Vec<_>>()
                .join(", ");
            if !joined.is_empty() {
                return Some(joined);
            }
        }
        if let Some(message) = envelope.message.filter(|m| !m.trim().is_empty()) {
            return Some(message);
        }
    }

    let fields = payload.as_object()?;
    let lines = fields
        .iter()
        .filter_map(|(field, value)| {
            flatten_messages(value)
                .into_iter()
                .next()
                .map(|first| format!("{field}: {first}"))
        })
        .collect::<Vec<_>>();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn flatten_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items.iter().flat_map(flatten_messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn status_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad Request",
        401 => "Unauthorized - Please login again",
        403 => "Forbidden - You do not have permission",
        404 => "Resource not found",
        409 => "Conflict - Resource already exists",
        422 => "Validation Error",
        429 => "Too many requests - Please try again later",
        500 => "Server Error - Please try again later",
        _ => "An unexpected error occurred",
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}
