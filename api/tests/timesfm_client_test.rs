//! TimesFM inference client against a mock server

use api::{Forecaster, ModelError, TimesFmCheckpoint, TimesFmClient, TimesFmHparams};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn checkpoint() -> TimesFmCheckpoint {
    TimesFmCheckpoint {
        huggingface_repo_id: "google/timesfm-2.0-500m-pytorch".to_string(),
    }
}

fn small_hparams() -> TimesFmHparams {
    TimesFmHparams {
        horizon_len: 3,
        ..TimesFmHparams::default()
    }
}

async fn mount_load(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/models/load"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "loaded" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_sends_hparams_and_checkpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/load"))
        .and(body_partial_json(json!({
            "hparams": {
                "backend": "pytorch",
                "per_core_batch_size": 32,
                "horizon_len": 128,
                "input_patch_len": 32,
                "output_patch_len": 128,
                "num_layers": 50,
                "model_dims": 1280
            },
            "checkpoint": { "huggingface_repo_id": "google/timesfm-2.0-500m-pytorch" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let model = TimesFmClient::load(
        &server.uri(),
        TimesFmHparams::default(),
        checkpoint(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(model.horizon_len(), 128);
}

#[tokio::test]
async fn test_load_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models/load"))
        .respond_with(ResponseTemplate::new(404).set_body_string("repository not found"))
        .mount(&server)
        .await;

    let err = TimesFmClient::load(&server.uri(), small_hparams(), checkpoint(), Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        ModelError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "repository not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_forecast_round_trip() {
    let server = MockServer::start().await;
    mount_load(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/forecast"))
        .and(body_partial_json(json!({ "inputs": [[1.0, 2.0, 3.0]], "freq": [1] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "point_forecast": [[4.0, 5.0, 6.0]],
            "quantile_forecast": [[[0.0]]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = TimesFmClient::load(&server.uri(), small_hparams(), checkpoint(), Duration::from_secs(5))
        .await
        .unwrap();
    let out = model.forecast(&[vec![1.0, 2.0, 3.0]], &[1]).await.unwrap();
    assert_eq!(out, vec![vec![4.0, 5.0, 6.0]]);
}

#[tokio::test]
async fn test_forecast_wrong_horizon() {
    let server = MockServer::start().await;
    mount_load(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "point_forecast": [[4.0, 5.0]] })),
        )
        .mount(&server)
        .await;

    let model = TimesFmClient::load(&server.uri(), small_hparams(), checkpoint(), Duration::from_secs(5))
        .await
        .unwrap();
    let err = model.forecast(&[vec![1.0]], &[1]).await.unwrap_err();
    assert!(matches!(err, ModelError::BadOutput(_)));
}

#[tokio::test]
async fn test_forecast_server_error() {
    let server = MockServer::start().await;
    mount_load(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let model = TimesFmClient::load(&server.uri(), small_hparams(), checkpoint(), Duration::from_secs(5))
        .await
        .unwrap();
    let err = model.forecast(&[vec![1.0]], &[1]).await.unwrap_err();
    assert!(matches!(err, ModelError::Status { status: 500, .. }));
}
