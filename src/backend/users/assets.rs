/**
 * Avatar Asset Storage
 *
 * Uploaded avatars live at `<assets_dir>/<user id>/<random name>.<ext>`.
 * Each user has at most one file: the folder is emptied before a new
 * avatar is written, and removed with the account.
 */

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::tasks::TaskScope;

/// Largest accepted avatar file
pub const MAX_AVATAR_BYTES: usize = 1024 * 1024;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Accepted avatar formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// File extension including the dot
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => ".jpg",
            ImageKind::Png => ".png",
        }
    }
}

/// Detect the image format from the leading bytes
///
/// The client-declared content type is ignored.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageKind::Jpeg)
    } else if bytes.starts_with(PNG_MAGIC) {
        Some(ImageKind::Png)
    } else {
        None
    }
}

/// Random file name for a new avatar
pub fn avatar_file_name(kind: ImageKind) -> String {
    format!("{}{}", Uuid::new_v4().simple(), kind.extension())
}

/// Folder holding a user's avatar
pub fn user_dir(root: &Path, user_id: Uuid) -> PathBuf {
    root.join(user_id.to_string())
}

/// Replace a user's avatar file
///
/// Checks `scope` after the folder exists and before anything is deleted or
/// written.
pub async fn store_avatar(
    root: &Path,
    user_id: Uuid,
    file_name: &str,
    contents: Bytes,
    scope: &TaskScope,
) -> Result<PathBuf, ApiError> {
    let dir = user_dir(root, user_id);
    tokio::fs::create_dir_all(&dir).await?;

    scope.checkpoint()?;
    clear_dir(&dir).await?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, &contents).await?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "Stored avatar");

    Ok(path)
}

/// Delete everything inside `dir`, keeping `dir` itself
async fn clear_dir(dir: &Path) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }

    Ok(())
}

/// Remove a user's avatar folder; a missing folder is not an error
pub async fn remove_user_dir(root: &Path, user_id: Uuid) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(user_dir(root, user_id)).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
