//! Serving API tests: the router is exercised in-process with a preloaded
//! predictor, no network or registry required.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use btc_forecast::application::composite::{CompositeMeta, PredictorState};
use btc_forecast::application::serving;
use btc_forecast::domain::ml::lstm::{Activation, Lstm, LstmConfig};
use btc_forecast::domain::ml::scaler::MinMaxScaler;
use btc_forecast::domain::ml::windowing::{N_STEPS_IN, N_STEPS_OUT, split_series};
use http_body_util::BodyExt;
use ndarray::Array2;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn payload_rows() -> Vec<Vec<f64>> {
    let block = [
        vec![59748.4, 58127.4, 61229.0, 57900.0],
        vec![58118.7, 58076.8, 58890.9, 57686.0],
        vec![58077.4, 55948.0, 58136.7, 55721.6],
    ];
    (0..15).map(|i| block[i % 3].clone()).collect()
}

fn test_state() -> Arc<PredictorState> {
    let rows = payload_rows();
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let raw = Array2::from_shape_vec((rows.len(), 4), flat).unwrap();

    let (x, y) = split_series(&raw, N_STEPS_IN, N_STEPS_OUT);
    let n = x.shape()[0];
    let windows = x.into_shape((n * N_STEPS_IN, 3)).unwrap();
    let scaler_x = MinMaxScaler::fit(&windows);
    let scaler_y = MinMaxScaler::fit(&y);

    let model = Lstm::new(LstmConfig {
        input_size: 3,
        hidden_size: 8,
        output_size: 5,
        layer_activations: vec![Activation::Sigmoid, Activation::Tanh],
        ..LstmConfig::default()
    });

    Arc::new(PredictorState::new(
        model,
        scaler_x,
        scaler_y,
        CompositeMeta::new(3),
    ))
}

fn post_invocations(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/invocations")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn fifteen_rows_yield_one_prediction_window() {
    let app = serving::router(test_state());

    let response = app
        .oneshot(post_invocations(json!({ "data": payload_rows() })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let predictions = body["predictions"].as_array().unwrap();

    // 15 rows derive exactly one (10-in, 5-out) window pair.
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn short_input_is_a_client_error() {
    let app = serving::router(test_state());

    let rows: Vec<Vec<f64>> = payload_rows().into_iter().take(5).collect();
    let response = app
        .oneshot(post_invocations(json!({ "data": rows })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Not enough rows"));
}

#[tokio::test]
async fn ragged_rows_are_a_client_error() {
    let app = serving::router(test_state());

    let mut rows = payload_rows();
    rows[3] = vec![1.0, 2.0];
    let response = app
        .oneshot(post_invocations(json!({ "data": rows })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = serving::router(test_state());

    let response = app
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
