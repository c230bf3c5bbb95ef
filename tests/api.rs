//! API endpoint integration tests
//!
//! Exercises the router with fake collaborators behind the pipeline seams.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tower::ServiceExt;

use parley_gateway::api::{ApiServer, ApiState};
use parley_gateway::pipeline::Pipeline;

mod common;
use common::{
    FakeGenerator, FakeSearch, FakeSynthesizer, FakeTranscriber, FakeWeather, build_pipeline,
    wav_bytes,
};

fn test_router(pipeline: Pipeline) -> axum::Router {
    ApiServer::router(Arc::new(ApiState { pipeline }))
}

fn happy_router() -> axum::Router {
    test_router(build_pipeline(
        Arc::new(FakeTranscriber::ok("spoken question")),
        Arc::new(FakeGenerator::ok("spoken answer")),
        Arc::new(FakeSynthesizer::ok()),
        FakeSearch::ok(),
        FakeWeather::ok(),
    ))
}

/// Encode a single-file multipart body with optional extra text fields
fn multipart_body(
    boundary: &str,
    audio: Option<&[u8]>,
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(audio) = audio {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"audio\"; \
                 filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(audio);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body was not JSON")
}

#[tokio::test]
async fn liveness_probe_responds() {
    for path in ["/", "/health"] {
        let response = happy_router()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn audio_chat_returns_text_and_audio() {
    let boundary = "test-boundary";
    let body = multipart_body(boundary, Some(&wav_bytes()), &[("lat", "52.52"), ("lon", "13.405")]);

    let response = happy_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["text"], "spoken answer");

    let audio = BASE64
        .decode(body["audio_base64"].as_str().unwrap())
        .expect("audio_base64 did not decode");
    assert_eq!(audio, common::FAKE_AUDIO);
}

#[tokio::test]
async fn missing_audio_field_is_bad_request() {
    let boundary = "test-boundary";
    let body = multipart_body(boundary, None, &[("lat", "52.52")]);

    let response = happy_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("ingest:"), "unexpected error: {error}");
}

#[tokio::test]
async fn non_numeric_location_still_completes() {
    let boundary = "test-boundary";
    let body = multipart_body(
        boundary,
        Some(&wav_bytes()),
        &[("lat", "north"), ("lon", "east")],
    );

    let response = happy_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn text_chat_skips_transcription() {
    let transcriber = Arc::new(FakeTranscriber::ok("unused"));
    let router = test_router(build_pipeline(
        transcriber.clone(),
        Arc::new(FakeGenerator::ok("typed answer")),
        Arc::new(FakeSynthesizer::ok()),
        FakeSearch::ok(),
        FakeWeather::ok(),
    ));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":"hello there"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["text"], "typed answer");
    assert_eq!(
        transcriber.calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn rate_limited_upstream_maps_to_429() {
    let router = test_router(build_pipeline(
        Arc::new(FakeTranscriber::ok("unused")),
        Arc::new(FakeGenerator::failing(|| {
            parley_gateway::Error::UpstreamRateLimited("chat returned 429".to_string())
        })),
        Arc::new(FakeSynthesizer::ok()),
        FakeSearch::ok(),
        FakeWeather::ok(),
    ));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":"busy?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("generate:"));
}

#[tokio::test]
async fn failed_synthesis_returns_error_without_text() {
    let router = test_router(build_pipeline(
        Arc::new(FakeTranscriber::ok("unused")),
        Arc::new(FakeGenerator::ok("an answer that must not leak")),
        Arc::new(FakeSynthesizer::failing()),
        FakeSearch::ok(),
        FakeWeather::ok(),
    ));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":"speak up"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("synthesize:"));
    assert!(body.get("text").is_none());
    assert!(body.get("audio_base64").is_none());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let response = happy_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"no_message_field":true}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
