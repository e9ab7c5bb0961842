//! Local directory object store
//!
//! Objects live at `<root>/<bucket>/<path>` and are published under
//! `{public_base_url}/storage/v1/object/public/<bucket>/<path>`.

use backstage_common::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Route prefix under which bucket objects are served
pub const PUBLIC_OBJECT_ROUTE: &str = "/storage/v1/object/public";

/// Bucket-per-directory file store
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileStore {
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self { root, public_base_url }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{base}/storage/v1/object/public/{bucket}/`
    pub fn public_url_prefix(&self, bucket: &str) -> String {
        format!("{}{}/{}/", self.public_base_url, PUBLIC_OBJECT_ROUTE, bucket)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}{}", self.public_url_prefix(bucket), path)
    }

    /// Resolve a bucket-relative path, rejecting anything that escapes the bucket
    pub fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        validate_segment("bucket", bucket)?;

        let relative = Path::new(path);
        if path.is_empty() {
            return Err(Error::InvalidInput("Object path is empty".to_string()));
        }
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::InvalidInput(format!("Object path must be relative: {}", path)));
        }

        Ok(self.root.join(bucket).join(relative))
    }

    /// Write a new object; fails if one already exists at that path
    pub async fn write(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    Error::Storage(format!("Object already exists: {}/{}", bucket, path))
                }
                _ => Error::Io(e),
            })?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!("Stored object {}/{} ({} bytes)", bucket, path, bytes.len());
        Ok(())
    }

    /// Remove objects in bulk
    ///
    /// Every path is validated before anything is removed. Objects that are
    /// already gone are skipped.
    pub async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let targets = paths
            .iter()
            .map(|p| self.object_path(bucket, p))
            .collect::<Result<Vec<_>>>()?;

        for target in targets {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => debug!("Removed object {}", target.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Object already absent: {}", target.display())
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }
}

fn validate_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!("Invalid {} name: {:?}", what, value)));
    }
    Ok(())
}

/// Derive a bucket-relative object path from a public URL
///
/// The URL must share scheme, host and port with `prefix` and its path must
/// start with the prefix path. Anything else is an `InvalidInput` error so
/// that callers abort instead of silently skipping the file.
///
/// ```
/// use backstage_admin::gateway::object_path_from_public_url;
///
/// let path = object_path_from_public_url(
///     "https://host/bucket/message-attachments/m1/a.png",
///     "https://host/bucket/message-attachments/",
/// )
/// .unwrap();
/// assert_eq!(path, "m1/a.png");
/// ```
pub fn object_path_from_public_url(public_url: &str, prefix: &str) -> Result<String> {
    let url = Url::parse(public_url)
        .map_err(|e| Error::InvalidInput(format!("Unparseable URL: {}", e)))?;
    let prefix = Url::parse(prefix)
        .map_err(|e| Error::InvalidInput(format!("Unparseable URL prefix: {}", e)))?;

    if url.scheme() != prefix.scheme()
        || url.host_str() != prefix.host_str()
        || url.port_or_known_default() != prefix.port_or_known_default()
    {
        return Err(Error::InvalidInput(format!(
            "URL does not belong to {}",
            prefix.origin().ascii_serialization()
        )));
    }

    let prefix_path = if prefix.path().ends_with('/') {
        prefix.path().to_string()
    } else {
        format!("{}/", prefix.path())
    };

    let remainder = url
        .path()
        .strip_prefix(prefix_path.as_str())
        .ok_or_else(|| Error::InvalidInput(format!("URL path is outside {}", prefix_path)))?;

    if remainder.is_empty() || remainder.split('/').any(|s| s.is_empty() || s == "..") {
        return Err(Error::InvalidInput(format!("URL has no usable object path: {}", url.path())));
    }

    Ok(remainder.to_string())
}
