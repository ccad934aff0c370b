use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::clinic_types::{BoundingBox, Place};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Forward geocoding and point-of-interest search. Read-only; the provider
/// rate-limits, so callers issue lookups one at a time.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for a free-text place name.
    async fn geocode(&self, query: &str) -> Result<Vec<Place>, AppError>;

    /// Dental clinics near a free-text place name.
    async fn search_near(&self, query: &str, limit: usize) -> Result<Vec<Place>, AppError>;

    /// Dental clinics strictly inside `bbox`.
    async fn search_viewbox(&self, bbox: BoundingBox, limit: usize) -> Result<Vec<Place>, AppError>;
}

/// Nominatim `/search` client.
#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::network(format!("Failed to build geocoder client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.geocoder_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, params: &[(&str, String)]) -> Result<Vec<Place>, AppError> {
        let url = format!("{}/search", self.base_url);
        debug!(%url, ?params, "geocoder search");

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json")])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "geocoder request failed");
            return Err(AppError::network(format!(
                "Geocoder returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Vec<Place>>()
            .await
            .map_err(|e| AppError::network(format!("Malformed geocoder response: {}", e)))
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Vec<Place>, AppError> {
        self.search(&[("q", query.to_string()), ("limit", "1".to_string())])
            .await
    }

    async fn search_near(&self, query: &str, limit: usize) -> Result<Vec<Place>, AppError> {
        self.search(&[
            ("q", format!("dentist near {}", query)),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    async fn search_viewbox(&self, bbox: BoundingBox, limit: usize) -> Result<Vec<Place>, AppError> {
        self.search(&[
            ("q", "dentist".to_string()),
            ("viewbox", bbox.to_query_value()),
            ("bounded", "1".to_string()),
            ("limit", limit.to_string()),
            ("addressdetails", "1".to_string()),
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clinic_types::LatLng;
    use crate::test_support::serve;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Echoes the query string and User-Agent back as a single place.
    async fn echo(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Json(json!([{
            "lat": "52.52",
            "lon": "13.405",
            "display_name": serde_json::to_string(&params).unwrap(),
            "type": agent,
        }]))
    }

    async fn client() -> NominatimClient {
        let base = serve(Router::new().route("/search", get(echo))).await;
        NominatimClient::new(&AppConfig {
            geocoder_base_url: base,
            user_agent: "dental-lens-test".to_string(),
            ..AppConfig::default()
        })
        .unwrap()
    }

    fn params(place: &Place) -> HashMap<String, String> {
        serde_json::from_str(&place.display_name).unwrap()
    }

    #[tokio::test]
    async fn geocode_asks_for_a_single_json_match() {
        let places = client().await.geocode("Berlin").await.unwrap();
        let p = params(&places[0]);
        assert_eq!(p["format"], "json");
        assert_eq!(p["q"], "Berlin");
        assert_eq!(p["limit"], "1");
        assert_eq!(places[0].kind.as_deref(), Some("dental-lens-test"));
        assert_eq!(places[0].position(), LatLng::new(52.52, 13.405));
    }

    #[tokio::test]
    async fn search_near_prefixes_the_dentist_query() {
        let places = client().await.search_near("10115 Berlin", 30).await.unwrap();
        let p = params(&places[0]);
        assert_eq!(p["q"], "dentist near 10115 Berlin");
        assert_eq!(p["addressdetails"], "1");
        assert_eq!(p["limit"], "30");
    }

    #[tokio::test]
    async fn viewbox_search_is_bounded() {
        let bbox = BoundingBox::around(LatLng::new(52.5, 13.4), 0.1);
        let places = client().await.search_viewbox(bbox, 30).await.unwrap();
        let p = params(&places[0]);
        assert_eq!(p["q"], "dentist");
        assert_eq!(p["bounded"], "1");
        assert_eq!(p["viewbox"], bbox.to_query_value());
    }

    #[tokio::test]
    async fn provider_error_is_a_network_error() {
        let base = serve(Router::new().route(
            "/search",
            get(|| async { StatusCode::TOO_MANY_REQUESTS }),
        ))
        .await;
        let client = NominatimClient::new(&AppConfig {
            geocoder_base_url: base,
            ..AppConfig::default()
        })
        .unwrap();

        let err = client.geocode("Paris").await.unwrap_err();
        assert!(err.message.contains("429"));
    }
}
