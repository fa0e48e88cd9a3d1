use async_trait::async_trait;
use docdesk_core::{
    ApiError, CreateProjectRequest, DocdeskClient, FileUpload, Project, UploadedFile,
};

use crate::entity::{EntityDraft, ProjectDraft};
use crate::reconciler::Keyed;

/// A server-side collection scoped under a parent id.
///
/// `create` yields the canonical resource with its server id; `attach` binds
/// an existing resource to the parent. Collections that record the parent at
/// create time return `Ok(())` from `attach`.
#[async_trait(?Send)]
pub trait RemoteCollection {
    type Item: Keyed + Clone;
    type Draft;

    async fn list(&self, parent_id: &str) -> Result<Vec<Self::Item>, ApiError>;
    async fn create(&self, parent_id: &str, draft: Self::Draft) -> Result<Self::Item, ApiError>;
    async fn attach(&self, parent_id: &str, resource_id: &str) -> Result<(), ApiError>;
    async fn delete(&self, resource_id: &str) -> Result<(), ApiError>;
}

/// Files attached to one project.
#[derive(Clone)]
pub struct ProjectFiles {
    client: DocdeskClient,
}

impl ProjectFiles {
    pub fn new(client: DocdeskClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl RemoteCollection for ProjectFiles {
    type Item = UploadedFile;
    type Draft = FileUpload;

    async fn list(&self, parent_id: &str) -> Result<Vec<UploadedFile>, ApiError> {
        self.client.list_project_files(parent_id).await
    }

    async fn create(&self, _parent_id: &str, draft: FileUpload) -> Result<UploadedFile, ApiError> {
        self.client.upload_file(&draft).await
    }

    async fn attach(&self, parent_id: &str, resource_id: &str) -> Result<(), ApiError> {
        self.client.attach_file(parent_id, resource_id).await
    }

    async fn delete(&self, resource_id: &str) -> Result<(), ApiError> {
        self.client.delete_file(resource_id).await
    }
}

/// Projects owned by one user; the parent id is the user id.
#[derive(Clone)]
pub struct UserProjects {
    client: DocdeskClient,
}

impl UserProjects {
    pub fn new(client: DocdeskClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl RemoteCollection for UserProjects {
    type Item = Project;
    type Draft = ProjectDraft;

    /// The server already scopes the list to the session user; the owner
    /// check only drops rows that name a different user.
    async fn list(&self, parent_id: &str) -> Result<Vec<Project>, ApiError> {
        let projects = self.client.list_projects().await?;
        Ok(projects
            .into_iter()
            .filter(|project| !project.is_deleted)
            .filter(|project| project.user.as_deref().is_none_or(|owner| owner == parent_id))
            .collect())
    }

    async fn create(&self, parent_id: &str, draft: ProjectDraft) -> Result<Project, ApiError> {
        let request = CreateProjectRequest {
            name: draft.name,
            description: draft.description,
            user_id: Some(parent_id.to_string()),
        };
        self.client.create_project(&request).await
    }

    async fn attach(&self, _parent_id: &str, _resource_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete(&self, resource_id: &str) -> Result<(), ApiError> {
        self.client.delete_project(resource_id).await
    }
}

/// Sends an edited entity to the update endpoint for its kind.
pub async fn save_edit(client: &DocdeskClient, id: &str, draft: EntityDraft) -> Result<(), ApiError> {
    match draft {
        EntityDraft::Project(project) => client
            .update_project(&project.into_update(id))
            .await
            .map(|_| ()),
        EntityDraft::File(update) => client.update_file_metadata(id, &update).await,
    }
}
