//! Contract File Listing
//!
//! Lists uploaded contract files through the backend's file endpoint.
//! The backend has returned both its own summaries and raw S3 object
//! entries, so both shapes (and bare keys) are accepted.

use serde::{Deserialize, Serialize};

use crate::error::{parse_http_error, PipelineError, PipelineResult};

/// One stored contract file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractFile {
    #[serde(alias = "Key", alias = "key")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(default, alias = "Size", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, alias = "LastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileEntry {
    Key(String),
    File(ContractFile),
}

impl From<FileEntry> for ContractFile {
    fn from(entry: FileEntry) -> Self {
        match entry {
            FileEntry::Key(name) => ContractFile {
                name,
                full_path: None,
                size: None,
                last_modified: None,
            },
            FileEntry::File(file) => file,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<FileEntry>,
}

/// Parse a file-listing response body.
pub fn parse_file_listing(body: &str) -> PipelineResult<Vec<ContractFile>> {
    let response: ListFilesResponse =
        serde_json::from_str(body).map_err(|e| PipelineError::ParseError {
            message: format!("Failed to parse file listing: {}", e),
        })?;
    Ok(response.files.into_iter().map(ContractFile::from).collect())
}

/// Client for the file listing endpoint.
#[derive(Debug, Clone)]
pub struct FileListingClient {
    client: reqwest::Client,
    url: String,
}

impl FileListingClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// List files, optionally scoped to one user's prefix.
    pub async fn list_files(&self, user_id: Option<&str>) -> PipelineResult<Vec<ContractFile>> {
        let mut request = self.client.get(&self.url);
        if let Some(uid) = user_id {
            request = request.query(&[("uid", uid)]);
        }

        let response = request.send().await.map_err(|e| PipelineError::network(&e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::stream(&e))?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body, &self.url));
        }

        let files = parse_file_listing(&body)?;
        tracing::debug!("Listed {} contract files from {}", files.len(), self.url);
        Ok(files)
    }
}
