//! Project API client methods

use super::{ApiClient, project_path};
use crate::cache::GetOptions;
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::types::{
    CreateProjectRequest, Project, ProjectConfig, ProjectConfigUpdate, ProjectList,
    UpdateProjectRequest,
};
use serde_json::Value;

fn config_path(slug: &str) -> String {
    format!("{}/config", project_path(slug))
}

impl ApiClient {
    /// Projects the user is a member of
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn list_projects(&self) -> Result<ProjectList> {
        self.dispatcher
            .request_json(&RequestDescriptor::get("/projects"))
            .await
    }

    /// Project by slug, served from the project cache while fresh
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the cached entry, if any, is kept
    pub async fn project(&self, slug: &str, options: GetOptions) -> Result<Project> {
        let dispatcher = &self.dispatcher;
        self.projects
            .get(slug, options, || async move {
                let descriptor = RequestDescriptor::get(project_path(slug));
                dispatcher.request_json(&descriptor).await
            })
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        let descriptor = RequestDescriptor::post("/projects").json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Update name/description. The project cache is not touched; use
    /// [`GetOptions::forced`] to read the new state.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn update_project(
        &self,
        slug: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project> {
        let descriptor = RequestDescriptor::patch(project_path(slug)).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Archive a project
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn delete_project(&self, slug: &str) -> Result<()> {
        self.dispatcher
            .request_json(&RequestDescriptor::delete(project_path(slug)))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn project_config(&self, slug: &str) -> Result<ProjectConfig> {
        self.dispatcher
            .request_json(&RequestDescriptor::get(config_path(slug)))
            .await
    }

    /// Overwrite the whole config (`PUT`)
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn replace_project_config(
        &self,
        slug: &str,
        config: &ProjectConfigUpdate,
    ) -> Result<ProjectConfig> {
        let descriptor = RequestDescriptor::put(config_path(slug)).json(config)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Update only the sections that are set (`PATCH`)
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn patch_project_config(
        &self,
        slug: &str,
        config: &ProjectConfigUpdate,
    ) -> Result<ProjectConfig> {
        let descriptor = RequestDescriptor::patch(config_path(slug)).json(config)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Ask the backend to try connecting with the stored config. The report
    /// shape depends on the configured stores.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn test_project_config(&self, slug: &str) -> Result<Value> {
        let path = format!("{}/test", config_path(slug));
        self.dispatcher
            .request_json(&RequestDescriptor::post(path))
            .await
    }
}
