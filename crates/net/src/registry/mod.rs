//! Device-management registry client
//!
//! Creates the application, content version and file entry objects, polls the
//! file entry's processing state, and commits the uploaded content.

mod models;

pub use models::FileEntryStatus;

use crate::client::NetClient;
use async_trait::async_trait;
use lobup_errors::{Error, NetworkError, RegistryError};
use lobup_types::{
    AppAttributes, AppId, ContentVersionId, FileEncryptionInfo, FileId, PackageManifest,
    UploadTarget,
};
use models::{
    CommitAppBody, CommitFileBody, ContentFileBody, CreatedResponse, Win32LobAppBody,
    WIN32_LOB_APP,
};
use reqwest::{Method, Response};
use serde::Serialize;
use std::fmt;

/// Registry operations the upload pipeline depends on
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Create the logical application object
    async fn create_application(
        &self,
        attributes: &AppAttributes,
        manifest: &PackageManifest,
    ) -> Result<AppId, Error>;

    /// Create a new content version under an application
    async fn create_content_version(&self, app: &AppId) -> Result<ContentVersionId, Error>;

    /// Register the payload file under a content version
    async fn create_file_entry(
        &self,
        app: &AppId,
        content_version: &ContentVersionId,
        manifest: &PackageManifest,
        encrypted_size: u64,
    ) -> Result<FileId, Error>;

    /// Read the file entry's processing state and storage URI
    async fn get_file_entry(&self, target: &UploadTarget) -> Result<FileEntryStatus, Error>;

    /// Ask the service to extend the storage URI's validity
    async fn renew_storage_uri(&self, target: &UploadTarget) -> Result<(), Error>;

    /// Hand over the encryption parameters once all blocks are committed
    async fn commit_file(
        &self,
        target: &UploadTarget,
        encryption: &FileEncryptionInfo,
    ) -> Result<(), Error>;

    /// Point the application at its committed content version
    async fn commit_app(
        &self,
        app: &AppId,
        content_version: &ContentVersionId,
    ) -> Result<(), Error>;
}

/// Bearer token presented on every registry request
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// HTTP implementation of [`RegistryApi`]
///
/// Each instance carries its own token; the underlying [`NetClient`] is shared.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    net: NetClient,
    base_url: String,
    token: AccessToken,
}

impl RegistryClient {
    pub fn new(net: NetClient, base_url: impl Into<String>, token: AccessToken) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            net,
            base_url,
            token,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn apps_url(&self) -> String {
        format!("{}/deviceAppManagement/mobileApps", self.base_url)
    }

    fn app_url(&self, app: &AppId) -> String {
        format!("{}/{app}", self.apps_url())
    }

    fn content_versions_url(&self, app: &AppId) -> String {
        format!("{}/microsoft.graph.win32LobApp/contentVersions", self.app_url(app))
    }

    fn files_url(&self, app: &AppId, content_version: &ContentVersionId) -> String {
        format!("{}/{content_version}/files", self.content_versions_url(app))
    }

    fn file_url(&self, target: &UploadTarget) -> String {
        format!(
            "{}/{}",
            self.files_url(&target.app_id, &target.content_version_id),
            target.file_id
        )
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, Error> {
        tracing::debug!(operation, %method, url, "registry request");
        let mut request = self
            .net
            .request(method, url)
            .bearer_auth(self.token.secret());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.net.send(request).await?;
        check_status(operation, response).await
    }

    async fn create<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<String, Error> {
        let response = self.call(operation, Method::POST, url, Some(body)).await?;
        let created: CreatedResponse = decode(operation, response).await?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                RegistryError::MissingField {
                    operation: operation.to_string(),
                    field: "id".to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn create_application(
        &self,
        attributes: &AppAttributes,
        manifest: &PackageManifest,
    ) -> Result<AppId, Error> {
        let body = Win32LobAppBody::new(attributes, manifest);
        let id = self.create("create application", &self.apps_url(), &body).await?;
        Ok(AppId::new(id))
    }

    async fn create_content_version(&self, app: &AppId) -> Result<ContentVersionId, Error> {
        let id = self
            .create(
                "create content version",
                &self.content_versions_url(app),
                &serde_json::json!({}),
            )
            .await?;
        Ok(ContentVersionId::new(id))
    }

    async fn create_file_entry(
        &self,
        app: &AppId,
        content_version: &ContentVersionId,
        manifest: &PackageManifest,
        encrypted_size: u64,
    ) -> Result<FileId, Error> {
        let body = ContentFileBody::new(manifest, encrypted_size);
        let id = self
            .create(
                "create file entry",
                &self.files_url(app, content_version),
                &body,
            )
            .await?;
        Ok(FileId::new(id))
    }

    async fn get_file_entry(&self, target: &UploadTarget) -> Result<FileEntryStatus, Error> {
        const OPERATION: &str = "get file entry";
        let response = self
            .call::<()>(OPERATION, Method::GET, &self.file_url(target), None)
            .await?;
        decode(OPERATION, response).await
    }

    async fn renew_storage_uri(&self, target: &UploadTarget) -> Result<(), Error> {
        let url = format!("{}/renewUpload", self.file_url(target));
        self.call::<()>("renew storage URI", Method::POST, &url, None)
            .await?;
        Ok(())
    }

    async fn commit_file(
        &self,
        target: &UploadTarget,
        encryption: &FileEncryptionInfo,
    ) -> Result<(), Error> {
        let url = format!("{}/commit", self.file_url(target));
        let body = CommitFileBody {
            file_encryption_info: encryption,
        };
        self.call("commit file", Method::POST, &url, Some(&body))
            .await?;
        Ok(())
    }

    async fn commit_app(
        &self,
        app: &AppId,
        content_version: &ContentVersionId,
    ) -> Result<(), Error> {
        let body = CommitAppBody {
            odata_type: WIN32_LOB_APP,
            committed_content_version: content_version.as_str(),
        };
        self.call("commit application", Method::PATCH, &self.app_url(app), Some(&body))
            .await?;
        Ok(())
    }
}

async fn check_status(operation: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::RequestFailed {
        operation: operation.to_string(),
        status: status.as_u16(),
        body: truncate(&body, 512),
    }
    .into())
}

async fn decode<T: serde::de::DeserializeOwned>(
    operation: &str,
    response: Response,
) -> Result<T, Error> {
    let text = response
        .text()
        .await
        .map_err(|e| NetworkError::RequestFailed(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| {
        RegistryError::InvalidResponse {
            operation: operation.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOi");
        assert_eq!(format!("{token:?}"), "AccessToken(..)");
    }

    #[test]
    fn test_urls() {
        let client = RegistryClient::new(
            NetClient::with_defaults().unwrap(),
            "https://graph.test/beta/",
            AccessToken::new("t"),
        );
        let target = UploadTarget::new(AppId::new("a"), ContentVersionId::new("1"), FileId::new("f"));
        assert_eq!(
            client.file_url(&target),
            "https://graph.test/beta/deviceAppManagement/mobileApps/a/microsoft.graph.win32LobApp/contentVersions/1/files/f"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééé", 3), "é...");
    }
}
