use crate::models::catalog_types::ModelKey;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Upload mode on the analysis page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Single,
    Batch,
}

/// A file the user picked, not yet read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "files", rename_all = "lowercase")]
pub enum PendingUpload {
    Single(SelectedFile),
    Batch(Vec<SelectedFile>),
}

impl PendingUpload {
    pub fn len(&self) -> usize {
        match self {
            PendingUpload::Single(_) => 1,
            PendingUpload::Batch(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Class label to probability, in the order the backend sent them.
///
/// Values may be fractions (`0.82`) or already-scaled percentages (`82.0`)
/// depending on the model; scaling is left to the presentation layer.
/// Numeric strings are accepted, anything else is skipped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Probabilities(pub Vec<(String, f64)>);

impl Probabilities {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == label).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Probabilities {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Probabilities(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Probabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Probabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProbabilitiesVisitor;

        impl<'de> Visitor<'de> for ProbabilitiesVisitor {
            type Value = Probabilities;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of class label to probability")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(4));
                while let Some((label, raw)) = access.next_entry::<String, serde_json::Value>()? {
                    let value = match &raw {
                        serde_json::Value::Number(n) => n.as_f64(),
                        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
                        _ => None,
                    };
                    if let Some(v) = value {
                        entries.push((label, v));
                    }
                }
                Ok(Probabilities(entries))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Probabilities::default())
            }
        }

        deserializer.deserialize_any(ProbabilitiesVisitor)
    }
}

/// One classified image as returned by `/api/predict`, and the shape of each
/// successful `/api/predict_batch` item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default)]
    pub prediction: String,
    /// 0-100 scale.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub all_probabilities: Probabilities,
    #[serde(default)]
    pub top_probabilities: Vec<(String, f64)>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub model_type: Option<ModelKey>,
    #[serde(default)]
    pub selected_model: Option<ModelKey>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A batch entry: either a prediction or the reason that file failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Success(PredictionResult),
    Failure {
        filename: Option<String>,
        error: String,
    },
}

impl BatchItem {
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchItem::Failure { .. })
    }
}

impl From<PredictionResult> for BatchItem {
    fn from(result: PredictionResult) -> Self {
        match result.error.clone().filter(|e| !e.trim().is_empty()) {
            Some(error) => BatchItem::Failure {
                filename: result.filename,
                error,
            },
            None => BatchItem::Success(PredictionResult { error: None, ..result }),
        }
    }
}

impl<'de> Deserialize<'de> for BatchItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PredictionResult::deserialize(deserializer).map(BatchItem::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub model_type: Option<ModelKey>,
    /// Echo of the requested model; some backends send it next to `model_type`.
    #[serde(default)]
    pub selected_model: Option<ModelKey>,
    #[serde(default, alias = "batch_results")]
    pub results: Vec<BatchItem>,
}

impl BatchResult {
    pub fn model(&self) -> Option<ModelKey> {
        self.model_type.or(self.selected_model)
    }
}
