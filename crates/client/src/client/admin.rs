//! Platform administration API client methods
//!
//! Every route here requires a superadmin session; others get a 403.

use super::{ApiClient, child_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::query::encode_query;
use crate::types::{
    AdminUser, AuditLogEntry, AuditLogQuery, CreateUserRequest, PageQuery, PlatformStats,
    UpdateUserRequest,
};

const USERS_PATH: &str = "/admin/users";

impl ApiClient {
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn admin_users(&self, page: PageQuery) -> Result<Vec<AdminUser>> {
        let path = format!("{USERS_PATH}{}", encode_query(&page)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns 409 if the email is already registered
    pub async fn admin_create_user(&self, request: &CreateUserRequest) -> Result<AdminUser> {
        let descriptor = RequestDescriptor::post(USERS_PATH).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Rename, enable/disable or promote a user
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown user
    pub async fn admin_update_user(
        &self,
        user_id: &str,
        request: &UpdateUserRequest,
    ) -> Result<AdminUser> {
        let descriptor = RequestDescriptor::patch(child_path(USERS_PATH, user_id)).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn audit_logs(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>> {
        let path = format!("/admin/audit-logs{}", encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        self.dispatcher
            .request_json(&RequestDescriptor::get("/admin/stats"))
            .await
    }
}
