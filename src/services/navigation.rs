use crate::error::AppError;
use crate::models::catalog_types::ModelCatalog;
use crate::services::api_client::DentalApi;
use crate::services::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Analysis,
    Locator,
    About,
}

impl View {
    /// Unknown names land on the home page.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "analysis" => View::Analysis,
            "locator" => View::Locator,
            "about" => View::About,
            _ => View::Home,
        }
    }
}

/// Model catalog as seen by the shell. Failure here blocks the analysis page
/// until a refetch succeeds.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum CatalogState {
    #[default]
    Loading,
    Ready(ModelCatalog),
    Failed(String),
}

impl CatalogState {
    pub async fn fetch(api: &dyn DentalApi) -> Self {
        match api.get_models(&CancelToken::new()).await {
            Ok(catalog) => {
                info!(models = catalog.0.len(), "model catalog loaded");
                CatalogState::Ready(catalog)
            }
            Err(e) => {
                warn!(error = %e, "model catalog unavailable");
                CatalogState::Failed(e.message)
            }
        }
    }

    pub fn catalog(&self) -> Option<&ModelCatalog> {
        match self {
            CatalogState::Ready(catalog) => Some(catalog),
            _ => None,
        }
    }
}

/// Which page is showing. Not persisted across restarts.
#[derive(Debug, Default)]
pub struct Navigator {
    current: View,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn navigate(&mut self, view: View, catalog: &CatalogState) -> Result<View, AppError> {
        if view == View::Analysis {
            match catalog {
                CatalogState::Ready(_) => {}
                CatalogState::Loading => return Err(AppError::network("Loading models...")),
                CatalogState::Failed(message) => return Err(AppError::network(message.clone())),
            }
        }
        self.current = view;
        Ok(view)
    }

    pub fn navigate_to(&mut self, name: &str, catalog: &CatalogState) -> Result<View, AppError> {
        self.navigate(View::from_name(name), catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ErrorKind;
    use crate::services::api_client::HttpDentalApi;
    use crate::test_support::serve;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    #[test]
    fn unknown_names_fall_back_to_home() {
        assert_eq!(View::from_name("locator"), View::Locator);
        assert_eq!(View::from_name("settings"), View::Home);
        assert_eq!(View::from_name(""), View::Home);
    }

    #[test]
    fn analysis_requires_a_loaded_catalog() {
        let mut nav = Navigator::new();

        let err = nav.navigate(View::Analysis, &CatalogState::Loading).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(nav.current(), View::Home);

        let failed = CatalogState::Failed("Failed to fetch models".to_string());
        let err = nav.navigate_to("analysis", &failed).unwrap_err();
        assert_eq!(err.message, "Failed to fetch models");

        let ready = CatalogState::Ready(ModelCatalog::default());
        assert_eq!(nav.navigate(View::Analysis, &ready).unwrap(), View::Analysis);
        assert_eq!(nav.current(), View::Analysis);
    }

    #[test]
    fn other_pages_ignore_catalog_state() {
        let mut nav = Navigator::new();
        let failed = CatalogState::Failed("down".to_string());
        assert_eq!(nav.navigate_to("locator", &failed).unwrap(), View::Locator);
        assert_eq!(nav.navigate_to("about", &failed).unwrap(), View::About);
    }

    #[test]
    fn catalog_state_serializes_with_status_tag() {
        let json = serde_json::to_value(CatalogState::Failed("down".to_string())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["detail"], "down");
        assert!(CatalogState::Loading.catalog().is_none());
    }

    #[tokio::test]
    async fn fetch_maps_backend_outcome_to_catalog_state() {
        let base = serve(
            Router::new()
                .route(
                    "/api/models",
                    get(|| async { Json(serde_json::json!({"dental": {"loaded": true, "classes": []}})) }),
                )
                .route("/down/api/models", get(|| async { StatusCode::SERVICE_UNAVAILABLE })),
        )
        .await;

        let up = HttpDentalApi::new(AppConfig {
            api_base_url: base.clone(),
            ..AppConfig::default()
        })
        .unwrap();
        let state = CatalogState::fetch(&up).await;
        assert!(state.catalog().unwrap().is_loaded(crate::models::catalog_types::ModelKey::Dental));

        let down = HttpDentalApi::new(AppConfig {
            api_base_url: format!("{}/down", base),
            ..AppConfig::default()
        })
        .unwrap();
        assert_eq!(
            CatalogState::fetch(&down).await,
            CatalogState::Failed("Failed to fetch models".to_string())
        );
    }
}
