use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::catalog_types::{ClearStatus, HealthStatus, ModelCatalog, ModelKey};
use crate::models::predict_types::{BatchResult, PredictionResult, SelectedFile};
use crate::services::cancel::CancelToken;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

const MODELS_PATH: &str = "/api/models";
const PREDICT_PATH: &str = "/api/predict";
const PREDICT_BATCH_PATH: &str = "/api/predict_batch";
const HEALTH_PATH: &str = "/health";
const CLEAR_PATH: &str = "/clear";

/// The inference backend, one HTTP round trip per call. No retries, no
/// caching. Callers serialize submissions themselves.
#[async_trait]
pub trait DentalApi: Send + Sync {
    async fn get_models(&self, cancel: &CancelToken) -> Result<ModelCatalog, AppError>;

    async fn predict_single(
        &self,
        file: &SelectedFile,
        model: ModelKey,
        cancel: &CancelToken,
    ) -> Result<PredictionResult, AppError>;

    async fn predict_batch(
        &self,
        files: &[SelectedFile],
        model: ModelKey,
        cancel: &CancelToken,
    ) -> Result<BatchResult, AppError>;

    async fn health_check(&self, cancel: &CancelToken) -> Result<HealthStatus, AppError>;

    async fn clear_files(&self, cancel: &CancelToken) -> Result<ClearStatus, AppError>;
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpDentalApi {
    client: reqwest::Client,
    config: AppConfig,
}

impl HttpDentalApi {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: config.normalized(),
        })
    }

    /// GET whose only failure mode is a network error.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, failure: &str) -> Result<T, AppError> {
        let url = self.config.api_url(path);
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            AppError::network(format!("{}: {}", failure, e))
        })?;

        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "{}", failure);
            return Err(AppError::network(failure));
        }

        parse_body(response, &url).await
    }

    /// Multipart POST whose non-2xx responses carry `{error: "..."}`.
    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form, failure: &str) -> Result<T, AppError> {
        let url = self.config.api_url(path);
        debug!(%url, "POST multipart");

        let response = self.client.post(&url).multipart(form).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            AppError::network(format!("{}: {}", failure, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| failure.to_string());
            warn!(%url, %status, "{}", message);
            return Err(AppError::server(message));
        }

        parse_body(response, &url).await
    }
}

async fn parse_body<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, AppError> {
    response.json::<T>().await.map_err(|e| {
        warn!(%url, error = %e, "malformed response");
        AppError::network(format!("Malformed response from {}: {}", url, e))
    })
}

fn guess_mime(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

async fn file_part(file: &SelectedFile) -> Result<Part, AppError> {
    let bytes = tokio::fs::read(file.path()).await.map_err(|e| {
        AppError::network(format!("Failed to read {}: {}", file.path().display(), e))
    })?;

    Part::bytes(bytes)
        .file_name(file.file_name.clone())
        .mime_str(guess_mime(file.path()))
        .map_err(AppError::from)
}

#[async_trait]
impl DentalApi for HttpDentalApi {
    async fn get_models(&self, cancel: &CancelToken) -> Result<ModelCatalog, AppError> {
        cancel
            .run(self.get_json(MODELS_PATH, "Failed to fetch models"))
            .await
    }

    async fn predict_single(
        &self,
        file: &SelectedFile,
        model: ModelKey,
        cancel: &CancelToken,
    ) -> Result<PredictionResult, AppError> {
        cancel
            .run(async {
                let form = Form::new()
                    .part("file", file_part(file).await?)
                    .text("model_type", model.as_str());

                let result: PredictionResult = self
                    .post_form(PREDICT_PATH, form, "Prediction failed")
                    .await?;

                // The backend reports per-image failures inside a 2xx body.
                if let Some(error) = result.error.as_ref().filter(|e| !e.trim().is_empty()) {
                    warn!(file = %file.file_name, "{}", error);
                    return Err(AppError::server(error.clone()));
                }
                Ok::<_, AppError>(result)
            })
            .await
    }

    async fn predict_batch(
        &self,
        files: &[SelectedFile],
        model: ModelKey,
        cancel: &CancelToken,
    ) -> Result<BatchResult, AppError> {
        if files.is_empty() {
            return Err(AppError::validation("Please select at least one image"));
        }

        cancel
            .run(async {
                let parts = futures::future::try_join_all(files.iter().map(file_part)).await?;
                let form = parts
                    .into_iter()
                    .fold(Form::new(), |form, part| form.part("files", part))
                    .text("model_type", model.as_str());

                let mut batch: BatchResult = self
                    .post_form(PREDICT_BATCH_PATH, form, "Batch prediction failed")
                    .await?;
                if batch.model().is_none() {
                    batch.model_type = Some(model);
                }
                Ok::<_, AppError>(batch)
            })
            .await
    }

    async fn health_check(&self, cancel: &CancelToken) -> Result<HealthStatus, AppError> {
        cancel
            .run(self.get_json(HEALTH_PATH, "Health check failed"))
            .await
    }

    async fn clear_files(&self, cancel: &CancelToken) -> Result<ClearStatus, AppError> {
        cancel
            .run(self.get_json(CLEAR_PATH, "Failed to clear files"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::predict_types::BatchItem;
    use crate::test_support::{serve, write_upload};
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn api_for(base: &str) -> HttpDentalApi {
        HttpDentalApi::new(AppConfig {
            api_base_url: base.to_string(),
            ..AppConfig::default()
        })
        .unwrap()
    }

    /// Echoes the multipart field names, file names and content types.
    async fn echo_fields(mut multipart: Multipart) -> Json<Value> {
        let mut fields = Vec::new();
        let mut model_type = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let text = field.text().await.unwrap();
            if name == "model_type" {
                model_type = text;
            }
            fields.push(json!({"name": name, "file_name": file_name, "content_type": content_type}));
        }
        Json(json!({
            "prediction": "caries",
            "confidence": 82.0,
            "all_probabilities": {"caries": 0.82, "healthy": 0.18},
            "model_type": model_type,
            "description": serde_json::to_string(&fields).unwrap(),
        }))
    }

    #[tokio::test]
    async fn get_models_parses_the_catalog() {
        let base = serve(Router::new().route(
            "/api/models",
            get(|| async {
                Json(json!({
                    "dental": {"loaded": true, "classes": [{"name": "caries", "icon": "🦷"}]},
                    "gingivitis": {"loaded": true, "classes": []}
                }))
            }),
        ))
        .await;

        let catalog = api_for(&base).get_models(&CancelToken::new()).await.unwrap();
        assert!(catalog.is_loaded(ModelKey::Dental));
        assert_eq!(catalog.classes(ModelKey::Dental)[0].name, "caries");
    }

    #[tokio::test]
    async fn get_models_non_2xx_is_a_network_error() {
        let base = serve(Router::new().route(
            "/api/models",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let err = api_for(&base).get_models(&CancelToken::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.message, "Failed to fetch models");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = api_for(&base).health_check(&CancelToken::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn predict_single_sends_file_and_model_type() {
        let base = serve(Router::new().route("/api/predict", post(echo_fields))).await;
        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::new(write_upload(&dir, "molar.png"));

        let result = api_for(&base)
            .predict_single(&file, ModelKey::Gingivitis, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(result.model_type, Some(ModelKey::Gingivitis));
        let fields: Vec<Value> = serde_json::from_str(result.description.as_deref().unwrap()).unwrap();
        assert_eq!(fields[0]["name"], "file");
        assert_eq!(fields[0]["file_name"], "molar.png");
        assert_eq!(fields[0]["content_type"], "image/png");
        assert_eq!(fields[1]["name"], "model_type");
    }

    #[tokio::test]
    async fn predict_single_surfaces_the_server_error_message() {
        let base = serve(Router::new().route(
            "/api/predict",
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": "model unavailable"})),
                )
            }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::new(write_upload(&dir, "a.jpg"));

        let err = api_for(&base)
            .predict_single(&file, ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.message, "model unavailable");
    }

    #[tokio::test]
    async fn unparseable_error_body_falls_back_to_generic_message() {
        let base = serve(
            Router::new()
                .route(
                    "/api/predict",
                    post(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream down</html>") }),
                )
                .route(
                    "/api/predict_batch",
                    post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"detail": "nope"}))) }),
                ),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::new(write_upload(&dir, "a.jpg"));
        let api = api_for(&base);

        let err = api
            .predict_single(&file, ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "Prediction failed");

        let err = api
            .predict_batch(&[file], ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "Batch prediction failed");
    }

    #[tokio::test]
    async fn error_inside_a_2xx_single_body_is_a_server_error() {
        let base = serve(Router::new().route(
            "/api/predict",
            post(|| async {
                Json(json!({"prediction": "Error", "confidence": 0.0, "error": "Image too large (max 10MB)"}))
            }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::new(write_upload(&dir, "big.jpg"));

        let err = api_for(&base)
            .predict_single(&file, ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.message, "Image too large (max 10MB)");
    }

    #[tokio::test]
    async fn predict_batch_sends_every_file_in_order() {
        async fn echo_batch(mut multipart: Multipart) -> Json<Value> {
            let mut results = Vec::new();
            while let Some(field) = multipart.next_field().await.unwrap() {
                if field.name() == Some("files") {
                    let name = field.file_name().unwrap_or_default().to_string();
                    results.push(json!({"prediction": "healthy", "confidence": 90.0, "filename": name}));
                }
            }
            Json(json!({"results": results}))
        }

        let base = serve(Router::new().route("/api/predict_batch", post(echo_batch))).await;
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<SelectedFile> = ["one.png", "two.jpg", "three.jpeg"]
            .iter()
            .map(|n| SelectedFile::new(write_upload(&dir, n)))
            .collect();

        let batch = api_for(&base)
            .predict_batch(&files, ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(batch.model_type, Some(ModelKey::Dental));
        let names: Vec<String> = batch
            .results
            .iter()
            .map(|item| match item {
                BatchItem::Success(r) => r.filename.clone().unwrap(),
                BatchItem::Failure { .. } => panic!("unexpected failure"),
            })
            .collect();
        assert_eq!(names, ["one.png", "two.jpg", "three.jpeg"]);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_locally() {
        // Nothing listens here; a network call would fail with a network error.
        let api = api_for("http://127.0.0.1:9");
        let err = api
            .predict_batch(&[], ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn missing_upload_file_fails_before_sending() {
        let api = api_for("http://127.0.0.1:9");
        let file = SelectedFile::new("/definitely/not/here.png");
        let err = api
            .predict_single(&file, ModelKey::Dental, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.contains("Failed to read"));
    }

    #[tokio::test]
    async fn cancelling_drops_the_pending_response() {
        let base = serve(Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": "running"}))
            }),
        ))
        .await;
        let api = api_for(&base);
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            remote.cancel();
        });

        let err = api.health_check(&token).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn health_and_clear_parse_status_payloads() {
        let base = serve(
            Router::new()
                .route(
                    "/health",
                    get(|| async {
                        Json(json!({
                            "status": "running",
                            "dental_model_loaded": true,
                            "gingivitis_model_loaded": false,
                            "dental_classes": ["caries", "calculus", "healthy", "discoloration"],
                            "gingivitis_classes": ["Healthy", "Gingivitis"],
                            "timestamp": "2026-10-16T09:00:00"
                        }))
                    }),
                )
                .route(
                    "/clear",
                    get(|| async { Json(json!({"message": "Cleared 3 files", "status": "success"})) }),
                ),
        )
        .await;
        let api = api_for(&base);

        let health = api.health_check(&CancelToken::new()).await.unwrap();
        assert_eq!(health.gingivitis_model_loaded, Some(false));
        assert_eq!(health.dental_classes.len(), 4);

        let cleared = api.clear_files(&CancelToken::new()).await.unwrap();
        assert_eq!(cleared.message, "Cleared 3 files");
    }
}
