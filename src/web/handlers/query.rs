//! The query endpoint: validate, invoke the model, classify the outcome.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use std::time::Instant;

use crate::state::AppState;
use crate::types::{AppError, QueryRequest, QueryResponse};

/// `POST /query`. Takes the raw bytes so every malformed request, invalid
/// UTF-8 included, gets our JSON error shape rather than the framework's.
/// Emits exactly one log record per call; the query text itself is only
/// logged at debug level.
pub async fn handle_query(State(state): State<AppState>, body: Bytes) -> Response {
    let started = Instant::now();
    let result = run_query(&state, &body).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            tracing::info!(model = %response.model, latency_ms, outcome = "ok", "query completed");
            Json(response).into_response()
        }
        Err(err) => {
            tracing::warn!(
                status = %err.status(),
                latency_ms,
                outcome = "error",
                detail = %err,
                "query failed"
            );
            err.into_response()
        }
    }
}

async fn run_query(state: &AppState, body: &[u8]) -> Result<QueryResponse, AppError> {
    let request: QueryRequest = serde_json::from_slice(body)
        .map_err(|_| AppError::Validation("Request body must be valid JSON".to_string()))?;

    if request.query.trim().is_empty() {
        return Err(AppError::Validation("Query is required".to_string()));
    }

    tracing::debug!(query = %request.query, "processing query");

    let model_id = state.config.model_id.as_str();
    let output = state.model.invoke(model_id, &request.query).await?;

    Ok(QueryResponse {
        query: request.query,
        response: output,
        model: model_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::services::ModelClient;
    use crate::state::AppState;
    use crate::types::ModelError;
    use crate::web::server::create_app;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct MockModel {
        calls: AtomicUsize,
        reply: Result<String, ModelError>,
    }

    impl MockModel {
        fn new(reply: Result<&str, ModelError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: reply.map(str::to_string),
            })
        }
    }

    #[async_trait]
    impl ModelClient for MockModel {
        async fn invoke(&self, _model_id: &str, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn test_app(model: Arc<MockModel>) -> Router {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            model_id: "demo-model-v1".to_string(),
            region: "us-east-1".to_string(),
            endpoint: "http://localhost:0".to_string(),
            api_key: None,
            max_tokens: 1000,
            temperature: 0.7,
            allowed_origin: "*".to_string(),
        };
        create_app(AppState::new(config, model))
    }

    async fn post_query(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/query")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_or_blank_query_is_rejected_without_model_call() {
        let model = MockModel::new(Ok("unused"));

        for body in ["{}", r#"{"query": ""}"#, r#"{"query": "   "}"#] {
            let (status, json) = post_query(test_app(model.clone()), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({"error": "Query is required"}));
        }

        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_model_call() {
        let model = MockModel::new(Ok("unused"));

        let (status, json) = post_query(test_app(model.clone()), "not json at all").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Request body must be valid JSON"}));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_utf8_body_gets_the_same_json_error_shape() {
        let model = MockModel::new(Ok("unused"));

        let (status, json) = post_query(test_app(model.clone()), vec![0xff, 0xfe, 0xfd]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Request body must be valid JSON"}));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn preflight_is_answered_with_cors_allowances() {
        let model = MockModel::new(Ok("unused"));

        let response = test_app(model.clone())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/query")
                    .header("origin", "https://chat.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "*",
            "test config allows any origin"
        );
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        let allow_headers = headers
            .get("access-control-allow-headers")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allow_headers.to_lowercase().contains("content-type"));

        // Preflight never reaches the handler or the model.
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn access_denied_maps_to_403_with_fixed_body() {
        let model = MockModel::new(Err(ModelError::AccessDenied(
            "User is not authorized to perform bedrock:InvokeModel".to_string(),
        )));

        let (status, json) = post_query(test_app(model), r#"{"query": "hi"}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        // Exact body shape; no internal detail may leak.
        assert_eq!(json, json!({"error": "Access denied"}));
    }

    #[tokio::test]
    async fn upstream_failures_map_per_classification() {
        let cases = [
            (
                ModelError::ResourceNotFound("bad id".to_string()),
                StatusCode::NOT_FOUND,
                "Model unavailable",
            ),
            (
                ModelError::Throttled("tps exceeded".to_string()),
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later",
            ),
            (
                ModelError::Unknown("connection reset".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        ];

        for (err, expected_status, expected_message) in cases {
            let model = MockModel::new(Err(err));
            let (status, json) = post_query(test_app(model), r#"{"query": "hi"}"#).await;
            assert_eq!(status, expected_status);
            assert_eq!(json, json!({"error": expected_message}));
        }
    }

    #[tokio::test]
    async fn successful_query_echoes_input_and_model_id() {
        let model = MockModel::new(Ok("AWS is a cloud computing platform."));

        let (status, json) = post_query(test_app(model), r#"{"query": "What is AWS?"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "query": "What is AWS?",
                "response": "AWS is a cloud computing platform.",
                "model": "demo-model-v1",
            })
        );
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let model = MockModel::new(Ok("unused"));
        let response = test_app(model)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
