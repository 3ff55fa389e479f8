//! OneDrive operations used by ingestion and upload.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Method, StatusCode};
use serde_json::json;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::auth::AccessTokenSource;
use crate::error::{DocAgentError, Result};

use super::http::{encode_path, shared_client, status_to_error};
use super::types::{DriveInfo, DriveItem, DriveItemPage};

/// Request body variants.
#[derive(Debug, Clone)]
enum Body {
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Upload strategies, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum UploadMethod {
    #[strum(to_string = "path-based simple")]
    PathSimple,
    #[strum(to_string = "path-based children")]
    PathChildren,
    #[strum(to_string = "folder-id based")]
    FolderId,
}

/// Thin client over the `/me/drive` endpoints.
///
/// Every request is authenticated through an [`AccessTokenSource`]. A `401`
/// invalidates the source and the request is sent once more with a fresh token.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use docagent::auth::StaticToken;
/// use docagent::graph::DriveClient;
///
/// # async fn example() -> docagent::error::Result<()> {
/// let drive = DriveClient::new(
///     "https://graph.microsoft.com/v1.0",
///     Arc::new(StaticToken("token".into())),
/// );
/// for item in drive.list_folder("/Documents").await? {
///     println!("{}", item.name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DriveClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl DriveClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: shared_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Body>,
    ) -> Result<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .header("client-request-id", uuid::Uuid::new_v4().to_string());
        request = match body {
            Some(Body::Json(value)) => request.json(value),
            Some(Body::Bytes(bytes)) => request
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes.clone()),
            None => request,
        };
        Ok(request.send().await?)
    }

    /// Send with a single re-authentication retry on `401`. The response is
    /// returned whatever its status.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Body>,
    ) -> Result<reqwest::Response> {
        tracing::debug!(%method, url, "Graph request");
        let resp = self.send_once(&method, url, body.as_ref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }
        tracing::warn!(url, "Token expired, refreshing authentication");
        self.tokens.invalidate().await?;
        self.send_once(&method, url, body.as_ref()).await
    }

    /// Send and fail on any non-success status.
    async fn send_checked(
        &self,
        method: Method,
        url: &str,
        body: Option<Body>,
    ) -> Result<reqwest::Response> {
        let resp = self.send(method, url, body).await?;
        ensure_success(resp).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.send_checked(Method::GET, url, None).await?;
        Ok(resp.json::<T>().await?)
    }

    pub async fn drive_info(&self) -> Result<DriveInfo> {
        let info: DriveInfo = self.get_json(&self.url("/me/drive")).await?;
        tracing::info!(
            name = info.name.as_deref().unwrap_or("Unknown"),
            drive_type = info.drive_type.as_deref().unwrap_or("Unknown type"),
            "Drive access confirmed"
        );
        Ok(info)
    }

    fn children_url(&self, folder_path: &str) -> String {
        let folder = folder_path.trim_matches('/');
        if folder.is_empty() {
            self.url("/me/drive/root/children")
        } else {
            self.url(&format!("/me/drive/root:/{}:/children", encode_path(folder)))
        }
    }

    fn item_by_path_url(&self, folder_path: &str) -> String {
        let folder = folder_path.trim_matches('/');
        if folder.is_empty() {
            self.url("/me/drive/root")
        } else {
            self.url(&format!("/me/drive/root:/{}", encode_path(folder)))
        }
    }

    /// List the direct children of a folder, following `@odata.nextLink`.
    pub async fn list_folder(&self, folder_path: &str) -> Result<Vec<DriveItem>> {
        let mut url = Some(self.children_url(folder_path));
        let mut items = Vec::new();
        while let Some(next) = url {
            let page: DriveItemPage = self.get_json(&next).await?;
            items.extend(page.value);
            url = page.next_link;
        }
        tracing::debug!(folder = folder_path, count = items.len(), "Listed folder");
        Ok(items)
    }

    /// List all files below a folder. Folders are descended into but not
    /// returned; each file carries its path relative to `folder_path`.
    pub async fn list_folder_recursive(&self, folder_path: &str) -> Result<Vec<DriveItem>> {
        self.list_recursive_inner(folder_path.to_string(), String::new())
            .await
    }

    fn list_recursive_inner(
        &self,
        root: String,
        relative: String,
    ) -> BoxFuture<'_, Result<Vec<DriveItem>>> {
        async move {
            let current = join_drive_path(&root, &relative);
            let items = self.list_folder(&current).await?;

            let mut files = Vec::new();
            let mut folders = Vec::new();
            for mut item in items {
                let rel = if relative.is_empty() {
                    item.name.clone()
                } else {
                    format!("{relative}/{}", item.name)
                };
                item.relative_path = Some(rel);
                if item.is_folder() {
                    folders.push(item);
                } else {
                    files.push(item);
                }
            }

            for folder in folders {
                let sub = folder.path().to_string();
                tracing::info!(subfolder = %sub, "Recursively processing subfolder");
                match self.list_recursive_inner(root.clone(), sub.clone()).await {
                    Ok(mut nested) => files.append(&mut nested),
                    Err(err) => {
                        tracing::warn!(
                            subfolder = %sub,
                            error = %err,
                            "Failed to process subfolder"
                        );
                    }
                }
            }
            Ok(files)
        }
        .boxed()
    }

    /// Download an item's content as raw bytes.
    pub async fn download(&self, item: &DriveItem) -> Result<Vec<u8>> {
        let url = self.url(&format!("/me/drive/items/{}/content", item.id));
        let resp = self.send_checked(Method::GET, &url, None).await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Look up an item by path; `None` when it does not exist.
    pub async fn get_item(&self, path: &str) -> Result<Option<DriveItem>> {
        let resp = self.send(Method::GET, &self.item_by_path_url(path), None).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.json::<DriveItem>().await?))
    }

    /// Folder id for a path (the drive root for `""` or `/`).
    pub async fn folder_id(&self, folder_path: &str) -> Result<Option<String>> {
        Ok(self.get_item(folder_path).await?.map(|item| item.id))
    }

    /// Create every missing level of `folder_path`.
    pub async fn ensure_folder(&self, folder_path: &str) -> Result<()> {
        let folder = folder_path.trim_matches('/');
        if folder.is_empty() {
            return Ok(());
        }
        if self.get_item(folder).await?.is_some() {
            tracing::debug!(folder = folder_path, "Folder exists");
            return Ok(());
        }

        tracing::info!(folder = folder_path, "Folder not found, creating");
        let mut current = String::new();
        for part in folder.split('/').filter(|p| !p.is_empty()) {
            let parent = current.clone();
            current = join_drive_path(&current, part);
            if self.get_item(&current).await?.is_some() {
                continue;
            }
            let body = json!({
                "name": part,
                "folder": {},
                "@microsoft.graph.conflictBehavior": "rename",
            });
            self.send_checked(Method::POST, &self.children_url(&parent), Some(Body::Json(body)))
                .await?;
            tracing::info!(folder = %current, "Created folder");
        }
        Ok(())
    }

    /// Upload a local file into `folder_path`, trying each [`UploadMethod`]
    /// until one succeeds.
    pub async fn upload(
        &self,
        local_path: &Path,
        folder_path: &str,
        file_name: Option<&str>,
    ) -> Result<DriveItem> {
        if !local_path.is_file() {
            return Err(DocAgentError::NotFound(format!(
                "Local file not found: {}",
                local_path.display()
            )));
        }
        let name = match file_name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    DocAgentError::InvalidArgument(format!(
                        "{} has no file name",
                        local_path.display()
                    ))
                })?,
        };
        let content = tokio::fs::read(local_path).await?;
        tracing::info!(file = %name, bytes = content.len(), folder = folder_path, "Uploading");

        let mut failures = Vec::new();
        for method in UploadMethod::iter() {
            match self.upload_with(method, folder_path, &name, &content).await {
                Ok(item) => {
                    tracing::info!(
                        %method,
                        id = %item.id,
                        web_url = item.web_url.as_deref().unwrap_or(""),
                        "Upload successful"
                    );
                    return Ok(item);
                }
                Err(err) => {
                    tracing::warn!(%method, error = %err, "Upload method failed");
                    failures.push(format!("{method}: {err}"));
                }
            }
        }
        Err(DocAgentError::Upload(format!(
            "All upload methods failed ({})",
            failures.join("; ")
        )))
    }

    pub async fn upload_with(
        &self,
        method: UploadMethod,
        folder_path: &str,
        name: &str,
        content: &[u8],
    ) -> Result<DriveItem> {
        let folder = folder_path.trim_matches('/');
        match method {
            UploadMethod::PathSimple => {
                let target = join_drive_path(folder, name);
                let url = self.url(&format!("/me/drive/root:/{}:/content", encode_path(&target)));
                self.put_content(&url, content).await
            }
            UploadMethod::PathChildren => {
                let body = json!({
                    "name": name,
                    "file": {},
                    "@microsoft.graph.conflictBehavior": "replace",
                });
                let created: DriveItem = self
                    .send_checked(Method::POST, &self.children_url(folder), Some(Body::Json(body)))
                    .await?
                    .json()
                    .await?;
                let url = self.url(&format!("/me/drive/items/{}/content", created.id));
                self.put_content(&url, content).await
            }
            UploadMethod::FolderId => {
                let folder_id = self.folder_id(folder).await?.ok_or_else(|| {
                    DocAgentError::NotFound(format!("Cannot get folder ID for: {folder_path}"))
                })?;
                let url = self.url(&format!(
                    "/me/drive/items/{folder_id}:/{}:/content",
                    encode_path(name)
                ));
                self.put_content(&url, content).await
            }
        }
    }

    async fn put_content(&self, url: &str, content: &[u8]) -> Result<DriveItem> {
        let resp = self
            .send_checked(Method::PUT, url, Some(Body::Bytes(content.to_vec())))
            .await?;
        Ok(resp.json::<DriveItem>().await?)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let headers = resp.headers().clone();
    let body = resp.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &headers, &body))
}

/// Join drive path segments without doubling or leaking slashes.
pub fn join_drive_path(base: &str, child: &str) -> String {
    let base = base.trim_matches('/');
    let child = child.trim_matches('/');
    match (base.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{child}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn client() -> DriveClient {
        DriveClient::new("https://graph.test/v1.0/", Arc::new(StaticToken("t".into())))
    }

    #[test]
    fn join_drive_path_handles_root_and_slashes() {
        assert_eq!(join_drive_path("/", "sub"), "sub");
        assert_eq!(join_drive_path("", ""), "");
        assert_eq!(join_drive_path("/Boeing/", "/Specs"), "Boeing/Specs");
        assert_eq!(join_drive_path("Boeing", ""), "Boeing");
    }

    #[test]
    fn children_url_uses_root_for_empty_path() {
        let c = client();
        assert_eq!(c.children_url("/"), "https://graph.test/v1.0/me/drive/root/children");
        assert_eq!(c.children_url(""), "https://graph.test/v1.0/me/drive/root/children");
        assert_eq!(
            c.children_url("/My Docs"),
            "https://graph.test/v1.0/me/drive/root:/My%20Docs:/children"
        );
    }

    #[test]
    fn upload_methods_are_ordered() {
        let order: Vec<String> = UploadMethod::iter().map(|m| m.to_string()).collect();
        assert_eq!(
            order,
            vec!["path-based simple", "path-based children", "folder-id based"]
        );
    }
}
