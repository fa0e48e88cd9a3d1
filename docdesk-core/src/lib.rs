mod client;
mod models;

pub use client::{ApiError, ApiErrorClass, DocdeskClient, ProjectAction};
pub use models::{
    CreateProjectRequest, FileMetadataUpdate, FileStatus, FileUpload, Project, ProjectStatus,
    UpdateProjectRequest, UploadedFile,
};
pub use reqwest::StatusCode;
