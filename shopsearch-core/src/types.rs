use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One ranked product as returned by the search service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductResult {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: Price,
    /// Server-relative image path (e.g. `/images/products/shoes/12.jpg`).
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    /// Only present for image-mode results, in `[0, 1]`.
    #[serde(default)]
    pub similarity: Option<f32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// The backend ships prices as preformatted strings (`"27.99 €"`); numeric
/// prices are accepted too.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Price {
    Label(String),
    Amount(f64),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Amount(amount) => write!(f, "{amount:.2}"),
        }
    }
}

/// Which channel produced the current results.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    None,
    Text,
    Image,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Empty,
    Error,
}

/// Snapshot of everything the result area needs to draw itself.
#[derive(Serialize, Clone, Debug, PartialEq, Default)]
pub struct SearchState {
    pub mode: SearchMode,
    pub phase: SearchPhase,
    pub results: Vec<ProductResult>,
    pub error_message: Option<String>,
}

impl SearchState {
    pub fn is_loading(&self) -> bool {
        self.phase == SearchPhase::Loading
    }
}

/// Image extensions accepted for upload, with their mime types.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
];

/// A locally selected image, held in memory until it is uploaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read an image from disk. Files without a known image extension are
    /// rejected before anything is sent.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("invalid file path: {}", path.display()))?
            .to_string();
        let mime = mime_for_name(&name)
            .ok_or_else(|| format!("'{name}' is not a supported image type"))?;
        let bytes = std::fs::read(path)
            .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
        Ok(Self::new(name, mime, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Look up the mime type for an image file name by extension.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
