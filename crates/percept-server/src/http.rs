//! HTTP surface: routing, multipart extraction, and error→status mapping.
//!
//! Thin wrapper over [`PredictionService`]. Status codes mirror the wire
//! contract: 400 for a non-image upload, 404 for an unrecognized family,
//! 422 for a missing `file` field, 500 for any pipeline failure. Error
//! bodies are `{"detail": "..."}`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderValue, StatusCode, header::InvalidHeaderValue};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use percept_core::{ModelFamily, PredictError};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::service::PredictionService;

/// Build the application router.
pub fn router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict/{family}", post(predict))
        .with_state(service)
}

/// CORS layer allowing a single configured origin, any method and header.
pub fn cors_layer(allow_origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin: HeaderValue = allow_origin.parse()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn root() -> Json<serde_json::Value> {
    let mut endpoints = serde_json::Map::new();
    endpoints.insert("health".into(), json!("/health"));
    for family in ModelFamily::ALL {
        endpoints.insert(family.as_str().into(), json!(format!("/predict/{family}")));
    }
    Json(json!({
        "message": "Percept image classification API",
        "endpoints": endpoints,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn predict(
    State(service): State<Arc<PredictionService>>,
    Path(family): Path<String>,
    mut multipart: Multipart,
) -> Response {
    // Unrecognized family segments are unmatched routes as far as clients
    // are concerned.
    let family = match family.parse::<ModelFamily>() {
        Ok(f) => f,
        Err(e) => return ApiError(e).into_response(),
    };

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some((content_type, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return unprocessable(format!("failed to read file field: {e}"));
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return unprocessable(format!("malformed multipart body: {e}")),
        }
    }

    let Some((content_type, bytes)) = file else {
        return unprocessable("missing required form field 'file'".to_string());
    };

    match service.predict(bytes, content_type.as_deref(), family).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

fn unprocessable(detail: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": detail})),
    )
        .into_response()
}

/// Maps each pipeline error variant to its status code.
struct ApiError(PredictError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PredictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictError::UnknownFamily(_) => StatusCode::NOT_FOUND,
            PredictError::Decode(_)
            | PredictError::Configuration(_)
            | PredictError::InputShape { .. }
            | PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "prediction failed");
        }
        (status, Json(json!({"detail": self.0.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use image::{DynamicImage, Rgb, RgbImage};
    use percept_vision::ModelRegistry;
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "percept-test-boundary";

    fn test_router(models_dir: &std::path::Path) -> Router {
        let service = Arc::new(PredictionService::new(ModelRegistry::new(models_dir)));
        router(service)
    }

    fn png_bytes(color: [u8; 3], width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    /// Build a multipart body with a single field.
    fn multipart_body(field_name: &str, content_type: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{field_name}\"; filename=\"upload\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_router(dir.path())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["endpoints"]["health"], "/health");
        assert_eq!(body["endpoints"]["resnet152"], "/predict/resnet152");
        assert_eq!(body["endpoints"]["vit"], "/predict/vit");
    }

    #[tokio::test]
    async fn unknown_family_returns_404() {
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body("file", "image/png", &png_bytes([255, 0, 0], 64, 64));
        let response = test_router(dir.path())
            .oneshot(multipart_request("/predict/unknownmodel", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_file_field_returns_422() {
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body("not_file", "image/png", &png_bytes([255, 0, 0], 64, 64));
        let response = test_router(dir.path())
            .oneshot(multipart_request("/predict/resnet152", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn non_image_content_type_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body("file", "text/plain", b"hello");
        let response = test_router(dir.path())
            .oneshot(multipart_request("/predict/vit", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pipeline_failure_returns_500_with_detail() {
        // Valid image and content type, but no model resources on disk.
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body("file", "image/png", &png_bytes([255, 0, 0], 224, 224));
        let response = test_router(dir.path())
            .oneshot(multipart_request("/predict/resnet152", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(!body["detail"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_returns_500() {
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body("file", "image/jpeg", b"invalid image data");
        let response = test_router(dir.path())
            .oneshot(multipart_request("/predict/vit", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn predicts_with_real_models() {
        // Exercises the full pipeline against exported model files. Skipped
        // when the models directory has not been populated.
        let models_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join("models");
        if !models_dir.join("resnet152.onnx").exists() {
            eprintln!("skipping: no model files in {}", models_dir.display());
            return;
        }

        let body = multipart_body("file", "image/png", &png_bytes([255, 0, 0], 224, 224));
        let response = test_router(&models_dir)
            .oneshot(multipart_request("/predict/resnet152", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["model_type"], "resnet152");
        let predictions = body["predictions"].as_array().unwrap();
        assert!((1..=5).contains(&predictions.len()));
        for pred in predictions {
            assert!(pred["class_name"].is_string());
            let confidence = pred["confidence"].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&confidence));
        }
    }
}
