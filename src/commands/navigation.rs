use crate::error::AppError;
use crate::services::navigation::View;
use crate::state::AppState;
use tauri::State;

#[tauri::command]
pub async fn navigate(state: State<'_, AppState>, view: String) -> Result<View, AppError> {
    let catalog = state.catalog.read().await;
    state.navigator.lock().await.navigate_to(&view, &catalog)
}

#[tauri::command]
pub async fn current_view(state: State<'_, AppState>) -> Result<View, AppError> {
    Ok(state.navigator.lock().await.current())
}
