//! Formatting of prediction payloads into display-ready cards.
//!
//! Everything here is a projection of the backend JSON; the only inference
//! is the probability scale (see [`normalize_percent`]).

use crate::config::AppConfig;
use crate::models::catalog_types::ModelKey;
use crate::models::predict_types::{BatchItem, BatchResult, PredictionResult, Probabilities};
use crate::services::analysis::ActiveResult;
use serde::Serialize;

/// Circumference of the confidence ring (r = 45 in a 100x100 viewbox).
pub const RING_CIRCUMFERENCE: f64 = 283.0;
pub const FALLBACK_ICON: &str = "📋";
pub const FALLBACK_COLOR: &str = "#667eea";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityBar {
    pub label: String,
    /// 0-100 after scale detection.
    pub percent: f64,
    /// `percent` clamped to a usable bar width.
    pub width: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleCard {
    pub title: String,
    pub model_label: Option<&'static str>,
    pub icon: String,
    pub color: String,
    pub description: Option<String>,
    pub interpretation: Option<String>,
    pub confidence: String,
    pub ring_offset: f64,
    pub bars: Vec<ProbabilityBar>,
    pub image_url: Option<String>,
    pub filename: Option<String>,
    pub upload_time: Option<String>,
    pub processing_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchCard {
    Success(SingleCard),
    /// Error items show only the error.
    Failure {
        filename: Option<String>,
        error: String,
    },
}

impl BatchCard {
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchCard::Failure { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchView {
    pub model_label: Option<&'static str>,
    pub cards: Vec<BatchCard>,
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "view", rename_all = "lowercase")]
pub enum ResultView {
    Single(SingleCard),
    Batch(BatchView),
}

/// Backend probabilities arrive either as fractions or already scaled.
/// Anything at or below 1 is treated as a fraction.
///
/// Known ambiguity: a genuine 1% sent pre-scaled as `1.0` reads as 100%.
pub fn normalize_percent(value: f64) -> f64 {
    if value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

/// Integer percentage label, e.g. `82%`.
pub fn format_percent(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

/// Confidence is already on the 0-100 scale.
pub fn format_confidence(confidence: f64) -> String {
    format_percent(confidence)
}

pub fn ring_offset(confidence: f64) -> f64 {
    RING_CIRCUMFERENCE - RING_CIRCUMFERENCE * confidence.clamp(0.0, 100.0) / 100.0
}

pub fn model_label(model: ModelKey) -> &'static str {
    match model {
        ModelKey::Dental => "Dental",
        ModelKey::Gingivitis => "Gingivitis",
    }
}

pub fn probability_bars(probabilities: &Probabilities) -> Vec<ProbabilityBar> {
    probabilities
        .iter()
        .map(|(label, value)| {
            let percent = normalize_percent(value);
            ProbabilityBar {
                label: label.to_string(),
                percent,
                width: percent.clamp(0.0, 100.0),
                display: format_percent(percent),
            }
        })
        .collect()
}

pub fn render_single(result: &PredictionResult, config: &AppConfig) -> SingleCard {
    SingleCard {
        title: result.prediction.clone(),
        model_label: result.selected_model.or(result.model_type).map(model_label),
        icon: result.icon.clone().unwrap_or_else(|| FALLBACK_ICON.to_string()),
        color: result.color.clone().unwrap_or_else(|| FALLBACK_COLOR.to_string()),
        description: result.description.clone(),
        interpretation: result.interpretation.clone(),
        confidence: format_confidence(result.confidence),
        ring_offset: ring_offset(result.confidence),
        bars: probability_bars(&result.all_probabilities),
        image_url: result.image_url.as_deref().map(|u| config.resolve_asset_url(u)),
        filename: result.filename.clone(),
        upload_time: result.upload_time.clone(),
        processing_time: result.processing_time_ms.map(|ms| format!("{} ms", ms)),
    }
}

pub fn render_batch(batch: &BatchResult, config: &AppConfig) -> BatchView {
    let cards: Vec<BatchCard> = batch
        .results
        .iter()
        .map(|item| match item {
            BatchItem::Success(result) => BatchCard::Success(render_single(result, config)),
            BatchItem::Failure { filename, error } => BatchCard::Failure {
                filename: filename.clone(),
                error: error.clone(),
            },
        })
        .collect();

    let failure_count = cards.iter().filter(|c| c.is_failure()).count();
    BatchView {
        model_label: batch.model().map(model_label),
        success_count: cards.len() - failure_count,
        failure_count,
        cards,
    }
}

pub fn render(result: &ActiveResult, config: &AppConfig) -> ResultView {
    match result {
        ActiveResult::Single(r) => ResultView::Single(render_single(r, config)),
        ActiveResult::Batch(b) => ResultView::Batch(render_batch(b, config)),
    }
}
