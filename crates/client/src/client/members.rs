//! Project membership API client methods

use super::{ApiClient, child_path, project_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::types::{AddMemberRequest, ProjectMember, UpdateMemberRequest};

fn members_path(slug: &str) -> String {
    format!("{}/members", project_path(slug))
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn list_members(&self, slug: &str) -> Result<Vec<ProjectMember>> {
        self.dispatcher
            .request_json(&RequestDescriptor::get(members_path(slug)))
            .await
    }

    /// Add an existing user to the project by email
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown email, or 403 without admin
    /// rights on the project
    pub async fn add_member(&self, slug: &str, email: &str, role: &str) -> Result<ProjectMember> {
        let descriptor =
            RequestDescriptor::post(members_path(slug)).json(&AddMemberRequest { email, role })?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn update_member(
        &self,
        slug: &str,
        user_id: &str,
        role: &str,
    ) -> Result<ProjectMember> {
        let path = child_path(&members_path(slug), user_id);
        let descriptor = RequestDescriptor::patch(path).json(&UpdateMemberRequest { role })?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn remove_member(&self, slug: &str, user_id: &str) -> Result<()> {
        let path = child_path(&members_path(slug), user_id);
        self.dispatcher
            .request_json(&RequestDescriptor::delete(path))
            .await
    }
}
