use crate::error::AppError;
use crate::models::catalog_types::{ClearStatus, HealthStatus, ModelCatalog, ModelKey};
use crate::models::predict_types::Tab;
use crate::services::analysis::{self, AnalysisSnapshot, Applied};
use crate::services::cancel::CancelToken;
use crate::services::navigation::CatalogState;
use crate::services::presentation::{self, ResultView};
use crate::services::preview;
use crate::state::AppState;
use tauri::State;
use tauri_plugin_dialog::DialogExt;
use tracing::debug;

#[tauri::command]
pub async fn get_models(state: State<'_, AppState>) -> Result<ModelCatalog, AppError> {
    match state.refresh_catalog().await {
        CatalogState::Ready(catalog) => Ok(catalog),
        CatalogState::Failed(message) => Err(AppError::network(message)),
        CatalogState::Loading => Err(AppError::network("Failed to fetch models")),
    }
}

#[tauri::command]
pub async fn catalog_status(state: State<'_, AppState>) -> Result<CatalogState, AppError> {
    Ok(state.catalog.read().await.clone())
}

#[tauri::command]
pub async fn health_check(state: State<'_, AppState>) -> Result<HealthStatus, AppError> {
    state.api.health_check(&CancelToken::new()).await
}

#[tauri::command]
pub async fn clear_uploads(state: State<'_, AppState>) -> Result<ClearStatus, AppError> {
    state.api.clear_files(&CancelToken::new()).await
}

#[tauri::command]
pub async fn analysis_state(state: State<'_, AppState>) -> Result<AnalysisSnapshot, AppError> {
    Ok(state.session.lock().await.snapshot())
}

#[tauri::command]
pub async fn select_model(state: State<'_, AppState>, model: ModelKey) -> Result<AnalysisSnapshot, AppError> {
    let mut session = state.session.lock().await;
    session.select_model(model);
    Ok(session.snapshot())
}

#[tauri::command]
pub async fn switch_tab(state: State<'_, AppState>, tab: Tab) -> Result<AnalysisSnapshot, AppError> {
    let mut session = state.session.lock().await;
    session.switch_tab(tab);
    Ok(session.snapshot())
}

/// Paths chosen by the frontend (drag and drop, file input).
#[tauri::command]
pub async fn select_images(state: State<'_, AppState>, paths: Vec<String>) -> Result<AnalysisSnapshot, AppError> {
    let files = preview::accepted_images(paths);
    let mut session = state.session.lock().await;
    session.select_files(files)?;
    Ok(session.snapshot())
}

/// Native picker; multi-select on the batch tab.
#[tauri::command]
pub async fn pick_images(app: tauri::AppHandle, state: State<'_, AppState>) -> Result<AnalysisSnapshot, AppError> {
    let tab = state.session.lock().await.selection().active_tab;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let dialog = app
        .dialog()
        .file()
        .add_filter("Images", &["png", "jpg", "jpeg"]);
    match tab {
        Tab::Single => dialog.pick_file(move |path| {
            let _ = tx.send(path.into_iter().collect::<Vec<_>>());
        }),
        Tab::Batch => dialog.pick_files(move |paths| {
            let _ = tx.send(paths.unwrap_or_default());
        }),
    }

    let picked = rx
        .await
        .map_err(|_| AppError::validation("File dialog closed unexpectedly"))?;
    let paths: Vec<String> = picked
        .into_iter()
        .filter_map(|p| p.into_path().ok())
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    let files = preview::accepted_images(paths);
    let mut session = state.session.lock().await;
    session.select_files(files)?;
    Ok(session.snapshot())
}

#[tauri::command]
pub async fn preview_image(path: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || preview::preview_data_url(std::path::Path::new(&path)))
        .await
        .map_err(|e| AppError::network(format!("Task join failed: {}", e)))?
}

/// Result and error land in the returned snapshot. A response that arrives
/// after the user moved on is dropped.
#[tauri::command]
pub async fn submit_analysis(state: State<'_, AppState>) -> Result<AnalysisSnapshot, AppError> {
    match analysis::submit_shared(&state.session, state.api.as_ref()).await {
        Ok(Applied::Stale) => debug!("submission superseded"),
        Ok(Applied::Current) => {}
        Err(e) => debug!(error = %e, "submission rejected"),
    }
    Ok(state.session.lock().await.snapshot())
}

#[tauri::command]
pub async fn clear_results(state: State<'_, AppState>) -> Result<AnalysisSnapshot, AppError> {
    let mut session = state.session.lock().await;
    session.clear();
    Ok(session.snapshot())
}

#[tauri::command]
pub async fn render_result(state: State<'_, AppState>) -> Result<Option<ResultView>, AppError> {
    let session = state.session.lock().await;
    Ok(session.result().map(|r| presentation::render(r, &state.config)))
}
