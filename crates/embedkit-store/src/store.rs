//! Folder-scoped file store for asset documents.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use embedkit_core::{AppConfig, EmbeddedAsset};

use crate::document::{from_document, to_document};
use crate::error::StoreError;
use crate::naming::{asset_file_name, asset_title, numbered};

/// Upper bound on `name_n.json` candidates tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Where a saved asset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAsset {
    pub folder: String,
    pub file_name: String,
    pub path: PathBuf,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub file_name: String,
    pub asset: EmbeddedAsset,
}

/// Stores asset documents under a root directory.
///
/// Folders are relative paths inside the root. Absolute paths and `..`
/// components are rejected; everything under the root is trusted.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    max_file_name_length: usize,
    max_asset_name_length: usize,
}

impl AssetStore {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        max_file_name_length: usize,
        max_asset_name_length: usize,
    ) -> Self {
        Self {
            root: root.into(),
            max_file_name_length,
            max_asset_name_length,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.storage_path.clone(),
            config.max_file_name_length,
            config.max_asset_name_length,
        )
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `asset` into `folder` under a free file name.
    ///
    /// The document is written to a temporary file first and then linked
    /// into place, so a reader never sees a partial document and an
    /// existing file is never overwritten. A taken name is retried as
    /// `name_1.json`, `name_2.json`, and so on.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidFolder`] if `folder` escapes the root.
    /// - [`StoreError::Io`] on any filesystem failure.
    /// - [`StoreError::NameExhausted`] if no free name is found.
    pub async fn save(&self, asset: &EmbeddedAsset, folder: &str) -> Result<SavedAsset, StoreError> {
        let dir = self.resolve_folder(folder)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let contents = to_document(asset)?;
        let temp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp_path, contents.as_bytes())
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;

        let result = self.link_free_name(asset, &dir, &temp_path).await;
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::warn!(path = %temp_path.display(), error = %e, "failed to remove temp file");
        }
        let (file_name, path) = result?;

        let saved = SavedAsset {
            folder: folder.trim_matches('/').to_string(),
            title: asset_title(asset, self.max_asset_name_length),
            file_name,
            path,
        };
        tracing::info!(
            folder = %saved.folder,
            file_name = %saved.file_name,
            url = asset.url(),
            "embedded asset saved"
        );
        Ok(saved)
    }

    async fn link_free_name(
        &self,
        asset: &EmbeddedAsset,
        dir: &Path,
        temp_path: &Path,
    ) -> Result<(String, PathBuf), StoreError> {
        let base_name = asset_file_name(asset, self.max_file_name_length);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                base_name.clone()
            } else {
                numbered(&base_name, attempt)
            };
            let path = dir.join(&file_name);
            match tokio::fs::hard_link(temp_path, &path).await {
                Ok(()) => return Ok((file_name, path)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        Err(StoreError::NameExhausted {
            file_name: base_name,
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// Reads the document at `relative_path` under the root. `Ok(None)`
    /// means the file exists but is not an embedded asset.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidFolder`] for paths escaping the root,
    /// [`StoreError::Io`] if the file cannot be read.
    pub async fn load(&self, relative_path: &str) -> Result<Option<EmbeddedAsset>, StoreError> {
        let path = self.resolve_folder(relative_path)?;
        read_document(&path).await
    }

    /// Every embedded asset directly inside `folder`, sorted by file name.
    /// Other files are skipped. A missing folder lists as empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidFolder`] or [`StoreError::Io`].
    pub async fn list(&self, folder: &str) -> Result<Vec<StoredAsset>, StoreError> {
        let dir = self.resolve_folder(folder)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') || !file_name.ends_with(".json") {
                continue;
            }
            if let Some(asset) = read_document(&entry.path()).await? {
                assets.push(StoredAsset { file_name, asset });
            }
        }
        assets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(assets)
    }

    fn resolve_folder(&self, folder: &str) -> Result<PathBuf, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidFolder {
            folder: folder.to_string(),
            reason: reason.to_string(),
        };

        let relative = Path::new(folder);
        if relative.is_absolute() {
            return Err(invalid("must be relative to the store root"));
        }

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("must not contain '..'")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be relative to the store root"))
                }
            }
        }
        Ok(resolved)
    }
}

/// Reads any document file from disk. `Ok(None)` if it is not an embedded
/// asset.
///
/// # Errors
///
/// [`StoreError::Io`] if the file cannot be read.
pub async fn read_document(path: &Path) -> Result<Option<EmbeddedAsset>, StoreError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    let asset = from_document(&text);
    if asset.is_none() {
        tracing::debug!(path = %path.display(), "file is not an embedded asset");
    }
    Ok(asset)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
