//! Upload/predict state for the analysis page.
//!
//! [`AnalysisSession`] is the single owner of selection, pending upload,
//! result and error state. Every mutation goes through a named transition so
//! the reset rule (changing model or tab clears everything else) lives in one
//! place. Each submission carries a generation number and a [`CancelToken`];
//! anything that supersedes it bumps the generation, so a late response can
//! never overwrite newer state.

use crate::error::AppError;
use crate::models::catalog_types::ModelKey;
use crate::models::predict_types::{BatchResult, PendingUpload, PredictionResult, SelectedFile, Tab};
use crate::services::api_client::DentalApi;
use crate::services::cancel::CancelToken;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const SELECT_IMAGE_MSG: &str = "Please select an image";
pub const SELECT_IMAGES_MSG: &str = "Please select at least one image";
pub const BUSY_MSG: &str = "A submission is already in progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Selecting,
    Submitting,
    Displaying,
    Failed,
}

/// Single and batch results are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ActiveResult {
    Single(PredictionResult),
    Batch(BatchResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub current_model: ModelKey,
    pub active_tab: Tab,
}

/// Whether a finished request was allowed to touch the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    Current,
    /// Superseded by a model/tab switch, a clear, or a newer submission.
    Stale,
}

/// Everything needed to run one submission outside the session lock.
#[derive(Debug)]
pub struct SubmitTicket {
    generation: u64,
    pub model: ModelKey,
    pub upload: PendingUpload,
    pub cancel: CancelToken,
}

impl SubmitTicket {
    pub async fn execute(&self, api: &dyn DentalApi) -> Result<ActiveResult, AppError> {
        match &self.upload {
            PendingUpload::Single(file) => api
                .predict_single(file, self.model, &self.cancel)
                .await
                .map(ActiveResult::Single),
            PendingUpload::Batch(files) => api
                .predict_batch(files, self.model, &self.cancel)
                .await
                .map(ActiveResult::Batch),
        }
    }
}

/// Serializable view handed to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub current_model: ModelKey,
    pub active_tab: Tab,
    pub phase: Phase,
    pub loading: bool,
    pub pending: Option<PendingUpload>,
    pub result: Option<ActiveResult>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct AnalysisSession {
    selection: Selection,
    phase: Phase,
    loading: bool,
    pending: Option<PendingUpload>,
    result: Option<ActiveResult>,
    error: Option<String>,
    generation: u64,
    in_flight: Option<CancelToken>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(ModelKey::default())
    }
}

impl AnalysisSession {
    pub fn new(model: ModelKey) -> Self {
        Self {
            selection: Selection {
                current_model: model,
                active_tab: Tab::Single,
            },
            phase: Phase::Idle,
            loading: false,
            pending: None,
            result: None,
            error: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn select_model(&mut self, model: ModelKey) {
        info!(model = %model, "model selected");
        self.reset();
        self.selection.current_model = model;
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        debug!(?tab, "tab switched");
        self.reset();
        self.selection.active_tab = tab;
    }

    /// Stores the user's pick for the active tab. The single tab keeps only
    /// the first file. An empty pick leaves the session untouched.
    pub fn select_files(&mut self, files: Vec<SelectedFile>) -> Result<(), AppError> {
        if self.loading {
            return Err(AppError::validation(BUSY_MSG));
        }
        if files.is_empty() {
            return Ok(());
        }

        self.pending = match self.selection.active_tab {
            Tab::Single => files.into_iter().next().map(PendingUpload::Single),
            Tab::Batch => Some(PendingUpload::Batch(files)),
        };
        self.phase = Phase::Selecting;
        Ok(())
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), AppError> {
        self.select_files(vec![file])
    }

    /// Moves to `Submitting` and hands out the ticket for the network call.
    /// An empty selection fails here and never reaches the network.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, AppError> {
        if self.loading {
            return Err(AppError::validation(BUSY_MSG));
        }

        let upload = match self.pending.take().filter(|p| !p.is_empty()) {
            Some(upload) => upload,
            None => {
                let message = match self.selection.active_tab {
                    Tab::Single => SELECT_IMAGE_MSG,
                    Tab::Batch => SELECT_IMAGES_MSG,
                };
                self.result = None;
                self.error = Some(message.to_string());
                self.phase = Phase::Failed;
                return Err(AppError::validation(message));
            }
        };

        self.supersede();
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        self.loading = true;
        self.phase = Phase::Submitting;
        self.result = None;
        self.error = None;

        info!(
            model = %self.selection.current_model,
            files = upload.len(),
            generation = self.generation,
            "submitting"
        );

        Ok(SubmitTicket {
            generation: self.generation,
            model: self.selection.current_model,
            upload,
            cancel,
        })
    }

    /// Applies a finished submission, unless something superseded it.
    pub fn complete_submit(&mut self, ticket: SubmitTicket, outcome: Result<ActiveResult, AppError>) -> Applied {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale response"
            );
            return Applied::Stale;
        }

        self.in_flight = None;
        self.loading = false;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
                self.phase = Phase::Displaying;
            }
            Err(e) => {
                info!(error = %e, "submission failed");
                self.result = None;
                self.error = Some(e.message);
                self.phase = Phase::Failed;
            }
        }
        Applied::Current
    }

    /// Runs a whole submission against `api` while holding the session.
    pub async fn submit(&mut self, api: &dyn DentalApi) -> Result<Applied, AppError> {
        let ticket = self.begin_submit()?;
        let outcome = ticket.execute(api).await;
        Ok(self.complete_submit(ticket, outcome))
    }

    /// Back to `Idle`. Model and tab are kept.
    pub fn clear(&mut self) {
        debug!("analysis cleared");
        self.reset();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    pub fn result(&self) -> Option<&ActiveResult> {
        self.result.as_ref()
    }

    pub fn single_result(&self) -> Option<&PredictionResult> {
        match &self.result {
            Some(ActiveResult::Single(r)) => Some(r),
            _ => None,
        }
    }

    pub fn batch_result(&self) -> Option<&BatchResult> {
        match &self.result {
            Some(ActiveResult::Batch(b)) => Some(b),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            current_model: self.selection.current_model,
            active_tab: self.selection.active_tab,
            phase: self.phase,
            loading: self.loading,
            pending: self.pending.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    fn reset(&mut self) {
        self.supersede();
        self.pending = None;
        self.result = None;
        self.error = None;
        self.loading = false;
        self.phase = Phase::Idle;
    }

    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

/// Runs a submission against a shared session without holding the lock
/// across the network call, so the user can switch tabs meanwhile.
pub async fn submit_shared(session: &Mutex<AnalysisSession>, api: &dyn DentalApi) -> Result<Applied, AppError> {
    let ticket = session.lock().await.begin_submit()?;
    let outcome = ticket.execute(api).await;
    Ok(session.lock().await.complete_submit(ticket, outcome))
}
