//! Integration test: HTTP endpoints

mod common;

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cardiokit::export::TrainedPipeline;
use cardiokit::inference::DriftPolicy;
use cardiokit::server::{create_router, AppState, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

fn shared_pipeline() -> Arc<TrainedPipeline> {
    static PIPELINE: OnceLock<Arc<TrainedPipeline>> = OnceLock::new();
    Arc::clone(PIPELINE.get_or_init(|| Arc::new(common::trained_pipeline())))
}

fn app_with(policy: DriftPolicy) -> axum::Router {
    let config = ServerConfig::default()
        .with_host("127.0.0.1")
        .with_port(0)
        .with_drift_policy(policy);
    let state = Arc::new(AppState::new(config.clone(), shared_pipeline()));
    create_router(state, &config)
}

fn test_app() -> axum::Router {
    app_with(DriftPolicy::FillDefaults)
}

async fn post(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get(test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"]["type"], "RandomForestClassifier");
    assert!(body["model"]["input_features"].as_array().unwrap().len() == 9);
}

#[tokio::test]
async fn test_predict_returns_label_and_probability() {
    let (status, body) = post(test_app(), "/predict", common::PATIENT).await;
    assert_eq!(status, StatusCode::OK);

    let prediction = body["prediction"].as_u64().unwrap();
    assert!(prediction == 0 || prediction == 1);
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    if probability != 0.5 {
        assert_eq!(prediction == 1, probability > 0.5);
    }
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let (_, first) = post(test_app(), "/predict", common::PATIENT).await;
    let (_, second) = post(test_app(), "/predict", common::PATIENT).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_array_body_matches_object_body() {
    let array_body = format!("[{}]", common::PATIENT);
    let (status, from_array) = post(test_app(), "/predict", &array_body).await;
    assert_eq!(status, StatusCode::OK);
    let (_, from_object) = post(test_app(), "/predict", common::PATIENT).await;
    assert_eq!(from_array, from_object);
}

#[tokio::test]
async fn test_string_numbers_are_coerced() {
    let body = r#"{
        "age": "63", "sex": "1", "cp": "3", "trestbps": "145", "chol": "233",
        "thalach": "150", "exang": "0", "oldpeak": "2.3", "thal": "fixed"
    }"#;
    let (status, from_strings) = post(test_app(), "/predict", body).await;
    assert_eq!(status, StatusCode::OK);
    let (_, from_numbers) = post(test_app(), "/predict", common::PATIENT).await;
    assert_eq!(from_strings, from_numbers);
}

#[tokio::test]
async fn test_empty_bodies_are_rejected() {
    for body in ["", "{}", "[]", "null", "[{}]"] {
        for uri in ["/predict", "/explain"] {
            let (status, json) = post(test_app(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} with body {:?}", uri, body);
            assert_eq!(json["error"], "Empty request body");
        }
    }
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let (status, body) = post(test_app(), "/predict", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_partial_record_uses_fill_defaults() {
    let (status, body) = post(test_app(), "/predict", r#"{"age": 70, "oldpeak": 4.0}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_u64());
}

#[tokio::test]
async fn test_reject_policy_refuses_partial_record() {
    let app = app_with(DriftPolicy::Reject);
    let (status, body) = post(app, "/predict", r#"{"age": 70, "oldpeak": 4.0}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("missing fields"));

    let app = app_with(DriftPolicy::Reject);
    let (status, _) = post(app, "/predict", common::PATIENT).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_explain_ranks_by_magnitude() {
    let (status, body) = post(
        test_app(),
        "/explain",
        r#"{"age": 45, "chol": 230, "thalach": 150, "oldpeak": 1.2}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let top = body["top_features"].as_array().unwrap();
    let names: Vec<&str> = top.iter().map(|f| f["feature"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["chol", "thalach", "age"]);
    assert_eq!(top[0]["importance"], 230.0);
}

#[tokio::test]
async fn test_explain_with_text_field_is_server_error() {
    let (status, body) = post(test_app(), "/explain", common::PATIENT).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("thal"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = get(test_app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("POST /predict"));
}

#[tokio::test]
async fn test_oversized_body_is_json_413() {
    // Past axum's default 2 MB body limit
    let padding = " ".repeat(3 * 1024 * 1024);
    let oversized = format!("{}{}", common::PATIENT, padding);

    for uri in ["/predict", "/explain"] {
        let (status, body) = post(test_app(), uri, &oversized).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let (status, _) = get(test_app(), "/predict").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
