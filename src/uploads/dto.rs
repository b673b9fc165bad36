use serde::Serialize;

/// Where an uploaded image ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub filename: String,
    pub path: String, // relative to the site root, e.g. "assets/food/tomato.jpg"
    pub url: String,
}
