use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
const DEFAULT_IMAGE_ORIGIN: &str = "http://localhost:5000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TOP_K: usize = 12;
const DEFAULT_BROWSE_COUNT: usize = 20;
const DEFAULT_PLACEHOLDER_IMAGE: &str =
    "https://via.placeholder.com/300x300?text=Image+Not+Found";

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where the search service lives.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct BackendConfig {
    /// Prefix for every API route (`/search/text`, `/search/image`, ...).
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Origin that server-supplied relative image paths are resolved against.
    #[serde(default = "default_image_origin")]
    pub image_origin: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            image_origin: default_image_origin(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_image_origin() -> String {
    DEFAULT_IMAGE_ORIGIN.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SearchConfig {
    /// Number of ranked results requested for an image search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Start an image search as soon as a file is selected.
    #[serde(default = "default_auto_search")]
    pub auto_search: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            auto_search: default_auto_search(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_auto_search() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct BrowseConfig {
    #[serde(default = "default_browse_count")]
    pub count: usize,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            count: default_browse_count(),
        }
    }
}

fn default_browse_count() -> usize {
    DEFAULT_BROWSE_COUNT
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            placeholder_image: default_placeholder_image(),
        }
    }
}

fn default_placeholder_image() -> String {
    DEFAULT_PLACEHOLDER_IMAGE.to_string()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        Self::parse(&contents)
    }

    /// Like `from_file`, but a missing file yields the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            log::debug!(
                "config file '{}' not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Config =
            toml::from_str(contents).map_err(|e| format!("invalid config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.search.top_k == 0 {
            return Err("invalid config: search.top_k must be at least 1".to_string());
        }
        if self.browse.count == 0 {
            return Err("invalid config: browse.count must be at least 1".to_string());
        }
        url::Url::parse(&self.backend.api_base)
            .map_err(|e| format!("invalid config: backend.api_base is not a URL: {e}"))?;
        url::Url::parse(&self.backend.image_origin)
            .map_err(|e| format!("invalid config: backend.image_origin is not a URL: {e}"))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("Config should always be serializable to TOML")
    }
}
