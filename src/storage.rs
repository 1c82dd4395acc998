// ============================================================================
// Object Storage
// ============================================================================
//
// Local-disk object store for listing photos and profile pictures. Objects
// are written under `storage_dir` and served back over HTTP at
// `{public_base_url}/media/{path}`, so callers persist only the returned URL.
//
// ============================================================================

use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};

pub struct ObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStorage {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url,
        }
    }

    /// Store `bytes` under `path` (overwriting any previous object) and
    /// return the URL at which the object is retrievable.
    pub async fn put(&self, path: &str, bytes: &[u8]) -> AppResult<String> {
        let relative = sanitize(path)?;
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        Ok(format!("{}/media/{}", self.public_base_url, path))
    }

    /// Delete the object at `path`. A missing object is not an error;
    /// account removal must not be blocked by an avatar that was never
    /// uploaded.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let relative = sanitize(path)?;
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Canonical storage path for a user's profile photo. A fixed name
    /// means a re-upload overwrites the old photo in place.
    pub fn profile_photo_path(user_id: &uuid::Uuid) -> String {
        format!("user_profiles/{}/profile.jpg", user_id)
    }
}

/// Reject traversal and absolute paths; only plain relative segments are
/// valid object keys.
fn sanitize(path: &str) -> AppResult<PathBuf> {
    let candidate = Path::new(path);
    if path.is_empty()
        || candidate.components().any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(AppError::validation("Invalid storage path"));
    }
    Ok(candidate.to_path_buf())
}
