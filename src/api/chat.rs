//! The chat endpoint: one pipeline invocation per request
//!
//! `POST /chat` accepts either a multipart body (`audio` file field plus
//! optional `lat`/`lon` text fields) or a JSON body `{ "message": ... }`
//! that skips transcription. Success returns the reply text and the
//! synthesized audio, base64-encoded at this boundary only.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::context::LocationHint;
use crate::pipeline::{AudioRequest, PipelineResult, Stage};

use super::ApiState;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

/// JSON variant of the chat request
#[derive(Debug, Deserialize)]
pub struct TextChatRequest {
    pub message: String,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Successful chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub audio_base64: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Handle a chat request, dispatching on content type
async fn chat(State(state): State<Arc<ApiState>>, request: Request) -> Response {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let result = if content_type.starts_with("multipart/form-data") {
        let multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("bad multipart body: {e}")),
        };
        match collect_audio_request(multipart).await {
            Ok(audio_request) => state.pipeline.run(audio_request).await,
            Err(response) => return response,
        }
    } else {
        let Json(body) = match Json::<TextChatRequest>::from_request(request, &()).await {
            Ok(json) => json,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("bad request body: {e}")),
        };
        let location = location_hint(body.lat, body.lon);
        state.pipeline.run_text(&body.message, location).await
    };

    pipeline_response(result)
}

/// Drain the multipart form into an [`AudioRequest`].
///
/// A missing `audio` field yields an empty payload so the pipeline reports
/// the failure at the ingest stage, where it belongs.
async fn collect_audio_request(mut multipart: Multipart) -> Result<AudioRequest, Response> {
    let mut bytes = Vec::new();
    let mut declared_format = None;
    let mut filename_hint = None;
    let mut lat = None;
    let mut lon = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("bad multipart body: {e}"),
                ));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                declared_format = field.content_type().map(ToString::to_string);
                filename_hint = field.file_name().map(ToString::to_string);
                bytes = match field.bytes().await {
                    Ok(data) => data.to_vec(),
                    Err(e) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read audio field: {e}"),
                        ));
                    }
                };
            }
            "lat" => lat = field.text().await.ok(),
            "lon" => lon = field.text().await.ok(),
            other => {
                tracing::debug!(field = %other, "ignoring unknown form field");
            }
        }
    }

    Ok(AudioRequest {
        bytes,
        declared_format,
        filename_hint,
        location: location_hint(lat, lon),
    })
}

/// Build a location hint when either coordinate was supplied.
///
/// A half-supplied or malformed pair still produces a hint; numeric
/// validation downstream degrades it to the weather sentinel.
fn location_hint(lat: Option<String>, lon: Option<String>) -> Option<LocationHint> {
    if lat.is_none() && lon.is_none() {
        return None;
    }
    Some(LocationHint {
        lat: lat.unwrap_or_default(),
        lon: lon.unwrap_or_default(),
    })
}

/// Render a pipeline result as an HTTP response
fn pipeline_response(result: PipelineResult) -> Response {
    match result {
        PipelineResult::Completed { text, audio } => {
            let audio_base64 = BASE64.encode(&audio.bytes);
            Json(ChatResponse { text, audio_base64 }).into_response()
        }
        PipelineResult::Failed { stage, error } => {
            error_response(status_for(&error), client_message(stage, &error))
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Map the error taxonomy to HTTP status codes
const fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::MissingInput(_) | Error::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        Error::UpstreamAuth(_) => StatusCode::UNAUTHORIZED,
        Error::UpstreamRateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        Error::UpstreamUnavailable(_) | Error::Synthesis(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Short, stage-scoped description for the client.
///
/// The full error (with upstream body excerpts) is already logged; the
/// caller only needs to know which stage failed and roughly why.
fn client_message(stage: Stage, error: &Error) -> String {
    let what = match error {
        Error::MissingInput(_) => "required input missing",
        Error::UnsupportedFormat(_) => "audio format not supported",
        Error::UpstreamAuth(_) => "upstream credentials rejected",
        Error::UpstreamRateLimited(_) => "upstream rate limit hit",
        Error::UpstreamUnavailable(_) => "upstream service unavailable",
        Error::Synthesis(_) => "speech synthesis failed",
        _ => "internal error",
    };
    format!("{stage}: {what}")
}
