pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(test)]
mod test_support;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use config::AppConfig;
    use services::navigation::CatalogState;
    use state::AppState;
    use tauri::{Emitter, Manager};

    logging::init_tracing();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .setup(|app| {
            let config = AppConfig::from_env()?;
            tracing::info!(api = %config.api_base_url, geocoder = %config.geocoder_base_url, "starting");

            let state = AppState::new(config)?;
            app.manage(state.clone());

            // Fetch the model catalog once; the analysis page stays locked until it lands.
            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let _ = app_handle.emit("catalog-status", CatalogState::Loading);
                let fetched = state.refresh_catalog().await;
                let _ = app_handle.emit("catalog-status", fetched);
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::analysis::get_models,
            commands::analysis::catalog_status,
            commands::analysis::health_check,
            commands::analysis::clear_uploads,
            commands::analysis::analysis_state,
            commands::analysis::select_model,
            commands::analysis::switch_tab,
            commands::analysis::select_images,
            commands::analysis::pick_images,
            commands::analysis::preview_image,
            commands::analysis::submit_analysis,
            commands::analysis::clear_results,
            commands::analysis::render_result,
            commands::clinic::search_clinics,
            commands::clinic::search_clinics_near,
            commands::clinic::location_unavailable,
            commands::clinic::select_clinic,
            commands::clinic::locator_state,
            commands::clinic::open_directions,
            commands::clinic::tile_layer,
            commands::navigation::navigate,
            commands::navigation::current_view,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
