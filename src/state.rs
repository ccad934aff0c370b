use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::analysis::AnalysisSession;
use crate::services::api_client::{DentalApi, HttpDentalApi};
use crate::services::clinic_locator::ClinicLocator;
use crate::services::geocoder::{Geocoder, NominatimClient};
use crate::services::navigation::{CatalogState, Navigator};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Everything the shell shares between commands. Cloning shares the state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn DentalApi>,
    pub geocoder: Arc<dyn Geocoder>,
    pub session: Arc<Mutex<AnalysisSession>>,
    pub catalog: Arc<RwLock<CatalogState>>,
    pub navigator: Arc<Mutex<Navigator>>,
    pub locator: Arc<Mutex<ClinicLocator>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let config = config.normalized();
        let api = Arc::new(HttpDentalApi::new(config.clone())?);
        let geocoder = Arc::new(NominatimClient::new(&config)?);
        Ok(Self::with_clients(config, api, geocoder))
    }

    pub fn with_clients(config: AppConfig, api: Arc<dyn DentalApi>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            config,
            api,
            geocoder,
            session: Arc::new(Mutex::new(AnalysisSession::default())),
            catalog: Arc::new(RwLock::new(CatalogState::Loading)),
            navigator: Arc::new(Mutex::new(Navigator::new())),
            locator: Arc::new(Mutex::new(ClinicLocator::new())),
        }
    }

    /// Fetches the catalog and replaces the stored one wholesale.
    pub async fn refresh_catalog(&self) -> CatalogState {
        *self.catalog.write().await = CatalogState::Loading;
        let fetched = CatalogState::fetch(self.api.as_ref()).await;
        *self.catalog.write().await = fetched.clone();
        fetched
    }
}
