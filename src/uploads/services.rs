use std::{path::Path, str::FromStr};

use bytes::Bytes;
use tracing::{error, info};

use super::dto::UploadedAsset;
use crate::auth::{repo_types::User, services::require_admin};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_EXT: &str = ".jpg";

/// Asset folders the frontend reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Ingredients,
    Food,
}

impl Folder {
    pub fn as_str(self) -> &'static str {
        match self {
            Folder::Ingredients => "ingredients",
            Folder::Food => "food",
        }
    }
}

impl FromStr for Folder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingredients" => Ok(Folder::Ingredients),
            "food" => Ok(Folder::Food),
            _ => Err(AppError::InvalidFolder),
        }
    }
}

pub struct UploadItem<'a> {
    pub folder: &'a str,
    pub name: &'a str,
    pub body: Bytes,
    pub content_type: &'a str,
    pub original_filename: Option<&'a str>,
}

/// "  Greek   Yogurt " -> "greek_yogurt"
pub fn normalize_filename(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Lowercased extension with leading dot, or `.jpg` when absent or unusable.
fn extension_of(original_filename: Option<&str>) -> String {
    original_filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXT.to_string())
}

pub async fn upload_image(
    st: &AppState,
    caller: User,
    item: UploadItem<'_>,
) -> AppResult<UploadedAsset> {
    let caller = require_admin(caller)?;

    let folder: Folder = item.folder.parse()?;
    if !item.content_type.starts_with("image/") {
        return Err(AppError::InvalidContentType);
    }

    let stem = normalize_filename(item.name);
    if stem.is_empty() || stem == "." || stem == ".." || stem.contains(['/', '\\']) {
        return Err(AppError::InvalidName);
    }

    let filename = format!("{}{}", stem, extension_of(item.original_filename));
    let key = format!("{}/{}", folder.as_str(), filename);

    st.storage.put_object(&key, item.body).await.map_err(|e| {
        error!(error = %e, key = %key, "asset write failed");
        AppError::StorageFailed(e)
    })?;

    let path = format!("assets/{}", key);
    info!(user_id = caller.id, path = %path, "image uploaded");
    Ok(UploadedAsset {
        url: format!("/{}", path),
        filename,
        path,
    })
}
