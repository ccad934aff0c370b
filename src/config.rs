use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const DEFAULT_TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
const DEFAULT_USER_AGENT: &str = concat!("dental-lens/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration, resolved once at startup and handed to every client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Inference backend, e.g. `http://localhost:8000`.
    pub api_base_url: String,
    /// Nominatim-compatible geocoder.
    pub geocoder_base_url: String,
    pub tile_url_template: String,
    pub tile_attribution: String,
    /// Sent on every geocoder request; the public Nominatim policy requires one.
    pub user_agent: String,
    /// `None` keeps the transport default.
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            geocoder_base_url: DEFAULT_GEOCODER_URL.to_string(),
            tile_url_template: DEFAULT_TILE_URL.to_string(),
            tile_attribution: DEFAULT_TILE_ATTRIBUTION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `DENTAL_LENS_*` environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DENTAL_LENS_API_URL") {
            config.api_base_url = url;
        }
        if let Some(url) = lookup("DENTAL_LENS_GEOCODER_URL") {
            config.geocoder_base_url = url;
        }
        if let Some(url) = lookup("DENTAL_LENS_TILE_URL") {
            config.tile_url_template = url;
        }
        if let Some(agent) = lookup("DENTAL_LENS_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(raw) = lookup("DENTAL_LENS_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                AppError::validation(format!("Invalid DENTAL_LENS_TIMEOUT_SECS {:?}: {}", raw, e))
            })?;
            config.request_timeout_secs = Some(secs);
        }

        Ok(config.normalized())
    }

    /// Base URLs without a trailing slash so paths can be appended verbatim.
    pub fn normalized(mut self) -> Self {
        self.api_base_url = trim_base(&self.api_base_url);
        self.geocoder_base_url = trim_base(&self.geocoder_base_url);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", trim_base(&self.api_base_url), path)
    }

    /// Backend image URLs are server-relative (`/static/uploads/...`).
    pub fn resolve_asset_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
            url.to_string()
        } else if url.starts_with('/') {
            self.api_url(url)
        } else {
            self.api_url(&format!("/{}", url))
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
