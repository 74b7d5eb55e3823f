//! Memory API client methods

use super::{ApiClient, child_path, project_path};
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::query::encode_query;
use crate::types::{
    AddMemoryRequest, BulkDeleteRequest, BulkDeleteResponse, ExportFormat, Memory,
    MemoryExport, MemoryHistoryEntry, MemoryList, MemoryListQuery, SearchRequest, SearchResult,
    UpdateMemoryRequest,
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

fn memories_path(slug: &str) -> String {
    format!("{}/memories", project_path(slug))
}

#[derive(Serialize)]
struct ExportQuery {
    format: ExportFormat,
}

impl ApiClient {
    /// Page through a project's memories
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn list_memories(&self, slug: &str, query: &MemoryListQuery) -> Result<MemoryList> {
        let path = format!("{}{}", memories_path(slug), encode_query(query)?);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn add_memory(&self, slug: &str, request: &AddMemoryRequest) -> Result<Memory> {
        let descriptor = RequestDescriptor::post(memories_path(slug)).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns a not-found error if the memory does not exist
    pub async fn memory(&self, slug: &str, memory_id: &str) -> Result<Memory> {
        let path = child_path(&memories_path(slug), memory_id);
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn update_memory(&self, slug: &str, memory_id: &str, content: &str) -> Result<Memory> {
        let path = child_path(&memories_path(slug), memory_id);
        let descriptor = RequestDescriptor::patch(path).json(&UpdateMemoryRequest { content })?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn delete_memory(&self, slug: &str, memory_id: &str) -> Result<()> {
        let path = child_path(&memories_path(slug), memory_id);
        self.dispatcher
            .request_json(&RequestDescriptor::delete(path))
            .await
    }

    /// Delete by id list and/or owning user. The backend rejects a request
    /// naming neither with a 400.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn bulk_delete_memories(
        &self,
        slug: &str,
        request: &BulkDeleteRequest,
    ) -> Result<BulkDeleteResponse> {
        let path = format!("{}/bulk-delete", memories_path(slug));
        let descriptor = RequestDescriptor::post(path).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Semantic search over a project's memories
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn search_memories(
        &self,
        slug: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let path = format!("{}/search", memories_path(slug));
        let descriptor = RequestDescriptor::post(path).json(request)?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn memory_history(
        &self,
        slug: &str,
        memory_id: &str,
    ) -> Result<Vec<MemoryHistoryEntry>> {
        let path = format!("{}/history", child_path(&memories_path(slug), memory_id));
        self.dispatcher
            .request_json(&RequestDescriptor::get(path))
            .await
    }

    /// Download every memory of a project as NDJSON or CSV
    ///
    /// The body is returned as received; it is not parsed.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn export_memories(&self, slug: &str, format: ExportFormat) -> Result<MemoryExport> {
        let path = format!(
            "{}/export{}",
            memories_path(slug),
            encode_query(&ExportQuery { format })?
        );
        let raw = self
            .dispatcher
            .request_raw(&RequestDescriptor::post(path))
            .await?;
        Ok(MemoryExport {
            format,
            content_type: raw.content_type,
            data: raw.body,
        })
    }

    /// Upload a JSONL export to be re-imported into a project
    ///
    /// Sent as a single multipart attempt: an expired session is reported as
    /// a 401 rather than refreshed.
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn import_memories(
        &self,
        slug: &str,
        file_name: impl Into<String>,
        contents: Vec<u8>,
    ) -> Result<Value> {
        let form = Form::new().part("file", Part::bytes(contents).file_name(file_name.into()));
        let path = format!("{}/import", memories_path(slug));
        self.dispatcher.upload(&path, form).await?.parse()
    }
}
