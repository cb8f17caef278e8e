// ABOUTME: Blob store writing uploaded images under a local root directory
// ABOUTME: Rejects absolute and parent-relative paths and builds public URLs from a configured base
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{BlobStore, BlobStoreError};
use crate::config::BlobStorageConfig;

/// Blob store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    /// Serve stored objects under `base_url`
    #[must_use]
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &BlobStorageConfig) -> Self {
        let store = Self::new(config.root_dir.clone());
        match &config.public_base_url {
            Some(base_url) => store.with_public_base_url(base_url.clone()),
            None => store,
        }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` under the root, refusing anything that could escape it
    fn resolve(&self, path: &str) -> Result<PathBuf, BlobStoreError> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        let mut segments = 0_usize;

        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    resolved.push(segment);
                    segments += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(BlobStoreError::InvalidPath(path.to_owned()));
                }
            }
        }

        if segments == 0 {
            return Err(BlobStoreError::InvalidPath(path.to_owned()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let target = self.resolve(path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobStoreError::Upload(format!("{}: {e}", parent.display())))?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| BlobStoreError::Upload(format!("{}: {e}", target.display())))?;

        debug!(path, content_type, size = bytes.len(), "Stored blob");
        Ok(path.to_owned())
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/{}", path.trim_start_matches('/')))
    }
}
