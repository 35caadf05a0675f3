//! Integration test: Server API endpoints

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use health_risk::inference::{ArtifactStore, Predictor};
use health_risk::server::{create_router, AppState, ModelResponse, PredictResponse};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

/// Train once per test binary; the state outlives the temporary directory
fn shared_state() -> Arc<AppState> {
    static STATE: OnceLock<Arc<AppState>> = OnceLock::new();
    STATE
        .get_or_init(|| {
            let (tmp, _) = common::trained_artifacts();
            let dir = tmp.path().join("artifacts");
            let predictor = Arc::new(Predictor::load(&dir).unwrap());
            let metrics = ArtifactStore::new(&dir).load_metrics().unwrap();
            Arc::new(AppState::new(predictor).with_training_metrics(metrics))
        })
        .clone()
}

fn test_app() -> Router {
    create_router(shared_state())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_root_serves_html() {
    let response = test_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/api/predict"));
    // Response text is inserted as text nodes, never parsed as markup
    assert!(!html.contains("innerHTML"));
    assert!(html.contains("textContent"));
}

#[tokio::test]
async fn test_model_endpoint() {
    let response = test_app()
        .oneshot(Request::builder().uri("/api/model").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let model: ModelResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(model.info.classes, ["Alto", "Baixo", "Moderado"]);
    assert_eq!(model.info.feature_columns.len(), model.info.n_features);
    assert!(model.trained_at.is_some());
    assert!(model.cv_best_score.is_none());
    assert!(model.test_accuracy.is_some());
}

#[tokio::test]
async fn test_predict_with_weight_and_height() {
    let payload = json!({
        "age": 58,
        "sex": "Feminino",
        "weight_kg": 81.0,
        "height_m": 1.5,
        "daily_steps": 3000,
        "smoker": "Sim",
        "alcohol": "Moderado",
        "cholesterol": 265,
        "systolic_pressure": 150,
        "family_history": "Sim"
    });
    let response = test_app()
        .oneshot(post_json("/api/predict", payload.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: PredictResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert!((body.bmi - 36.0).abs() < 1e-9);
    assert_eq!(body.prediction.label, "Alto");
    assert_eq!(body.percentages.len(), 3);
    assert!(body.percentages.values().all(|p| p.ends_with('%')));
}

#[tokio::test]
async fn test_predict_empty_object_uses_defaults() {
    let response = test_app()
        .oneshot(post_json("/api/predict", "{}".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["bmi"], 28.0);
    assert!(body["probabilities"].as_object().unwrap().len() == 3);
}

#[tokio::test]
async fn test_predict_rejects_half_measurement() {
    let response = test_app()
        .oneshot(post_json("/api/predict", json!({"weight_kg": 70.0}).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().contains("height_m"));
}

#[tokio::test]
async fn test_predict_rejects_malformed_json() {
    let response = test_app()
        .oneshot(post_json("/api/predict", "{\"age\": ".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], true);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let response = test_app()
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], true);
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    let response = test_app()
        .oneshot(Request::builder().uri("/api/predict").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
