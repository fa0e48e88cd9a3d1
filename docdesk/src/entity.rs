use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docdesk_core::{FileMetadataUpdate, FileUpload, Project, UpdateProjectRequest, UploadedFile};
use thiserror::Error;

const MAX_PROJECT_NAME: usize = 255;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("metadata entry `{0}` must look like key=value")]
    MalformedEntry(String),
    #[error("{path} is {size} bytes, uploads are limited to {max} bytes")]
    TooLarge { path: PathBuf, size: u64, max: u64 },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    File,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::File => "file",
        }
    }
}

/// Attributes edited through the shared create/edit/delete dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDraft {
    Project(ProjectDraft),
    File(FileMetadataUpdate),
}

impl EntityDraft {
    pub fn from_project(project: &Project) -> Self {
        EntityDraft::Project(ProjectDraft {
            name: project.name.clone(),
            description: project.description.clone(),
        })
    }

    pub fn from_file(file: &UploadedFile) -> Self {
        EntityDraft::File(FileMetadataUpdate {
            file_name: file.file_name.clone(),
            file_metadata: file.file_metadata.clone(),
            file_tags: file.file_tags.clone(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDraft::Project(_) => EntityKind::Project,
            EntityDraft::File(_) => EntityKind::File,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            EntityDraft::Project(project) => &project.name,
            EntityDraft::File(file) => &file.file_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Create,
    Edit,
    Delete,
}

/// Title for a generic dialog, e.g. "Delete file".
pub fn dialog_title(action: DialogAction, kind: EntityKind) -> String {
    let verb = match action {
        DialogAction::Create => "Create",
        DialogAction::Edit => "Edit",
        DialogAction::Delete => "Delete",
    };
    format!("{verb} {}", kind.label())
}

/// Confirmation line shown before a delete goes out.
pub fn delete_prompt(draft: &EntityDraft) -> String {
    format!(
        "Are you sure you want to delete the {} \"{}\"? This action cannot be undone.",
        draft.kind().label(),
        draft.display_name()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
}

impl ProjectDraft {
    pub fn builder(name: impl Into<String>) -> ProjectDraftBuilder {
        ProjectDraftBuilder {
            name: name.into(),
            description: None,
        }
    }

    /// PATCH body for an edit; an absent description is left unchanged.
    pub fn into_update(self, id: impl Into<String>) -> UpdateProjectRequest {
        UpdateProjectRequest {
            id: id.into(),
            name: Some(self.name),
            description: self.description,
            ..UpdateProjectRequest::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectDraftBuilder {
    name: String,
    description: Option<String>,
}

impl ProjectDraftBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Result<ProjectDraft, DraftError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DraftError::Empty("project name"));
        }
        if name.chars().count() > MAX_PROJECT_NAME {
            return Err(DraftError::TooLong {
                field: "project name",
                max: MAX_PROJECT_NAME,
            });
        }
        let description = self
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Ok(ProjectDraft { name, description })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileMetadataBuilder {
    file_name: String,
    metadata: BTreeMap<String, String>,
    tags: Vec<String>,
}

impl FileMetadataBuilder {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Accepts `key=value`.
    pub fn parse_entry(self, raw: &str) -> Result<Self, DraftError> {
        let (key, value) = raw
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| DraftError::MalformedEntry(raw.to_string()))?;
        Ok(self.entry(key.trim(), value.trim()))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into().trim().to_string();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn build(self) -> Result<FileMetadataUpdate, DraftError> {
        let file_name = self.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(DraftError::Empty("file name"));
        }
        Ok(FileMetadataUpdate {
            file_name,
            file_metadata: self.metadata,
            file_tags: self.tags,
        })
    }
}

/// Reads a local file into an upload draft, enforcing the size limit.
pub async fn upload_from_path(path: &Path) -> Result<FileUpload, DraftError> {
    let read_err = |source| DraftError::Read {
        path: path.to_path_buf(),
        source,
    };
    let size = tokio::fs::metadata(path).await.map_err(read_err)?.len();
    if size > FileUpload::MAX_BYTES {
        return Err(DraftError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: FileUpload::MAX_BYTES,
        });
    }
    let bytes = tokio::fs::read(path).await.map_err(read_err)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or(DraftError::Empty("file name"))?;
    let upload = FileUpload::new(file_name, bytes);
    Ok(match guess_content_type(path) {
        Some(content_type) => upload.with_content_type(content_type),
        None => upload,
    })
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    })
}
