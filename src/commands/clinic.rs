use crate::error::AppError;
use crate::models::clinic_types::{LatLng, TileLayer};
use crate::services::clinic_locator::{self, LocatorSnapshot};
use crate::state::AppState;
use tauri::State;
use tauri_plugin_opener::OpenerExt;

#[tauri::command]
pub async fn search_clinics(state: State<'_, AppState>, query: String) -> Result<LocatorSnapshot, AppError> {
    let mut locator = state.locator.lock().await;
    locator.search(state.geocoder.as_ref(), &query).await;
    Ok(locator.snapshot())
}

/// Called by the frontend with the browser geolocation result.
#[tauri::command]
pub async fn search_clinics_near(
    state: State<'_, AppState>,
    lat: f64,
    lon: f64,
) -> Result<LocatorSnapshot, AppError> {
    let mut locator = state.locator.lock().await;
    locator
        .search_from_position(state.geocoder.as_ref(), LatLng::new(lat, lon))
        .await;
    Ok(locator.snapshot())
}

#[tauri::command]
pub async fn location_unavailable(state: State<'_, AppState>, reason: String) -> Result<String, AppError> {
    Ok(state.locator.lock().await.report_location_error(&reason).to_string())
}

#[tauri::command]
pub async fn select_clinic(
    state: State<'_, AppState>,
    index: usize,
    from_marker: Option<bool>,
) -> Result<LocatorSnapshot, AppError> {
    let mut locator = state.locator.lock().await;
    let selected = if from_marker.unwrap_or(false) {
        locator.select_from_marker(index)
    } else {
        locator.select_from_list(index)
    };
    if selected.is_none() {
        return Err(format!("No clinic at index {}", index).into());
    }
    Ok(locator.snapshot())
}

#[tauri::command]
pub async fn locator_state(state: State<'_, AppState>) -> Result<LocatorSnapshot, AppError> {
    Ok(state.locator.lock().await.snapshot())
}

#[tauri::command]
pub async fn open_directions(app: tauri::AppHandle, state: State<'_, AppState>, index: usize) -> Result<(), AppError> {
    let url = {
        let locator = state.locator.lock().await;
        let place = locator
            .clinics()
            .get(index)
            .ok_or_else(|| AppError::validation(format!("No clinic at index {}", index)))?;
        clinic_locator::directions_url(place)
    };
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| AppError::network(format!("Failed to open directions: {}", e)))
}

#[tauri::command]
pub fn tile_layer(state: State<'_, AppState>) -> TileLayer {
    TileLayer {
        url_template: state.config.tile_url_template.clone(),
        attribution: state.config.tile_attribution.clone(),
    }
}
