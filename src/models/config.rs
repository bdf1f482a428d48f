use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Client settings from `lodtex.yaml`
///
/// Only describes how the client reaches the services and where downloads go.
/// The per-session conversion options (excluded columns, widths) are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub downloads: DownloadSettings,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub debug_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL of the conversion service; endpoints live under `api/`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout. Absent means the HTTP client's own default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DownloadSettings {
    /// Save downloads straight into this directory instead of asking with a dialog
    #[serde(default)]
    pub directory: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Reject width values outside `min_width..=max_width` before submitting
    #[serde(default)]
    pub enforce_width_range: bool,

    #[serde(default = "default_min_width")]
    pub min_width: f64,

    #[serde(default = "default_max_width")]
    pub max_width: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enforce_width_range: false,
            min_width: default_min_width(),
            max_width: default_max_width(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_min_width() -> f64 {
    1.0
}

fn default_max_width() -> f64 {
    10.0
}
