use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which backend classifier handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKey {
    #[default]
    Dental,
    Gingivitis,
}

impl ModelKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Dental => "dental",
            ModelKey::Gingivitis => "gingivitis",
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dental" => Ok(ModelKey::Dental),
            "gingivitis" => Ok(ModelKey::Gingivitis),
            other => Err(AppError::validation(format!("Invalid model type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

/// `GET /api/models`, keyed by model name. Unknown model names are kept so a
/// newer backend does not break the catalog fetch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog(pub BTreeMap<String, ModelInfo>);

impl ModelCatalog {
    pub fn get(&self, key: ModelKey) -> Option<&ModelInfo> {
        self.0.get(key.as_str())
    }

    pub fn is_loaded(&self, key: ModelKey) -> bool {
        self.get(key).map(|m| m.loaded).unwrap_or(false)
    }

    pub fn classes(&self, key: ModelKey) -> &[ClassInfo] {
        self.get(key).map(|m| m.classes.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub dental_model_loaded: Option<bool>,
    #[serde(default)]
    pub gingivitis_model_loaded: Option<bool>,
    #[serde(default)]
    pub dental_classes: Vec<String>,
    #[serde(default)]
    pub gingivitis_classes: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
