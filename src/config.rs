use std::path::PathBuf;

use crate::ai::DEFAULT_MODEL;
use crate::model::DEFAULT_LOGO_URL;
use crate::numbering::DEFAULT_PREFIX;

/// Runtime settings, read from the environment. CLI flags override fields
/// after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Holds `store.json`.
    pub data_dir: PathBuf,
    /// Extra font directories, searched before the bundled `fonts/`.
    pub font_dirs: Vec<String>,
    /// Base URL serving the four font files.
    pub fonts_url: Option<String>,
    /// Logo path or URL. `None` disables the logo.
    pub logo: Option<String>,
    pub receipt_prefix: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),
            font_dirs: Vec::new(),
            fonts_url: None,
            logo: Some(DEFAULT_LOGO_URL.to_string()),
            receipt_prefix: DEFAULT_PREFIX.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Split a path list on the platform separator, dropping empty entries.
pub fn split_path_list(value: &str) -> Vec<String> {
    let sep = if cfg!(windows) { ';' } else { ':' };
    value
        .split(sep)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();
        Config {
            data_dir: get("TKR_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            font_dirs: get("TKR_FONTS").map(|v| split_path_list(&v)).unwrap_or_default(),
            fonts_url: get("TKR_FONTS_URL"),
            logo: get("TKR_LOGO").or(defaults.logo),
            receipt_prefix: get("TKR_RECEIPT_PREFIX").unwrap_or(defaults.receipt_prefix),
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model: get("TKR_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
        }
    }

    /// Candidate bases for font resolution, in priority order.
    pub fn font_candidates(&self) -> Vec<String> {
        let mut candidates = self.font_dirs.clone();
        candidates.push("./fonts".to_string());
        candidates.push("fonts".to_string());
        if let Some(url) = &self.fonts_url {
            candidates.push(url.clone());
        }
        candidates
    }
}
