// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// Responsibilities:
// - POST /api/getChat: stream filtered answer frames (always HTTP 200)
// - OPTIONS /api/getChat: CORS preflight (CorsLayer); other methods 405
// - POST /api/getSources: web search for a question
// - POST /api/getParsedSources: fetch and extract source pages
// - Heartbeat endpoint

use crate::message::{parse_chat_request, ChatMessage, RequestError};
use crate::sources::{ParsedSource, SearchResult, SourceError};
use crate::stream::{Notice, OutboundEvent};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::FutureExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Outbound SSE frames for one chat response.
pub type FrameStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

// ---------------------------------------------------------------------------
// Traits (dependency injection points)
// ---------------------------------------------------------------------------

/// Produces the answer stream for a validated chat request.
///
/// Failures are reported in-band as notice frames, never as errors, so the
/// client's streaming reader always gets a body.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> FrameStream;
}

#[async_trait::async_trait]
pub trait SourceBackend: Send + Sync {
    async fn find_sources(&self, question: &str) -> Result<Vec<SearchResult>, SourceError>;

    async fn parse_sources(
        &self,
        sources: Vec<SearchResult>,
    ) -> Result<Vec<ParsedSource>, SourceError>;
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatBackend>,
    pub sources: Arc<dyn SourceBackend>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Largest chat request body read; anything bigger gets a notice frame.
pub const MAX_CHAT_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Chat handler. Every outcome is a 200 streaming body; request problems
/// become a single descriptive frame.
///
/// The body is taken raw so that an oversized request is answered in-band
/// instead of by the extractor's 413.
pub async fn chat_handler(State(state): State<AppState>, body: Body) -> Response {
    let parsed = read_body(body, MAX_CHAT_BODY_BYTES)
        .await
        .and_then(|bytes| parse_chat_request(&bytes));

    let frames = match parsed {
        Ok(messages) => {
            match AssertUnwindSafe(state.chat.stream_chat(messages))
                .catch_unwind()
                .await
            {
                Ok(frames) => frames,
                Err(_) => {
                    tracing::error!("chat backend panicked");
                    single_frame(Notice::TechnicalDifficulties.to_frame())
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "rejected chat request");
            single_frame(request_error_frame(&e))
        }
    };

    streaming_response(frames)
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Collect a request body, stopping as soon as it passes `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, RequestError> {
    let mut data = body.into_data_stream();
    let mut collected = BytesMut::new();
    while let Some(chunk) = data.next().await {
        let chunk = chunk.map_err(|e| RequestError::Unreadable(e.to_string()))?;
        if collected.len() + chunk.len() > limit {
            return Err(RequestError::BodyTooLarge { limit });
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(collected.freeze())
}

fn request_error_frame(e: &RequestError) -> Bytes {
    match e {
        RequestError::EmptyBody => Notice::MissingBody.to_frame(),
        RequestError::BodyTooLarge { .. } => Notice::BodyTooLarge.to_frame(),
        RequestError::Unreadable(_) => Notice::TechnicalDifficulties.to_frame(),
        RequestError::InvalidBody(msg) => {
            OutboundEvent::new(format!("\u{26a0}\u{fe0f} Invalid request body: {msg}")).to_frame()
        }
        RequestError::InvalidMessages(_) => Notice::InvalidRequest.to_frame(),
    }
}

fn single_frame(frame: Bytes) -> FrameStream {
    Box::pin(stream::iter(vec![frame]))
}

fn streaming_response(frames: FrameStream) -> Response {
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SourcesQuery {
    question: Option<String>,
}

#[derive(Deserialize)]
struct ParseSourcesRequest {
    sources: Option<serde_json::Value>,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn get_sources(State(state): State<AppState>, body: Bytes) -> Response {
    let question = serde_json::from_slice::<SourcesQuery>(&body)
        .ok()
        .and_then(|q| q.question)
        .filter(|q| !q.trim().is_empty());
    let Some(question) = question else {
        return json_error(StatusCode::BAD_REQUEST, "Question is required");
    };

    match state.sources.find_sources(&question).await {
        Ok(results) => Json(results).into_response(),
        Err(SourceError::NotConfigured) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "No search engine configured")
        }
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch sources")
        }
    }
}

pub async fn get_parsed_sources(State(state): State<AppState>, body: Bytes) -> Response {
    let sources = serde_json::from_slice::<ParseSourcesRequest>(&body)
        .ok()
        .and_then(|r| r.sources)
        .filter(|v| v.is_array())
        .and_then(|v| serde_json::from_value::<Vec<SearchResult>>(v).ok());
    let Some(sources) = sources else {
        return json_error(StatusCode::BAD_REQUEST, "Sources array is required");
    };

    match state.sources.parse_sources(sources).await {
        Ok(parsed) => Json(parsed).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "source parsing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse sources")
        }
    }
}

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Browser clients call the chat endpoint cross-origin.
fn chat_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the axum router. Backends are injected; no hard-coded clients.
pub fn build_router(chat: Arc<dyn ChatBackend>, sources: Arc<dyn SourceBackend>) -> Router {
    let state = AppState { chat, sources };

    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route(
            "/api/getChat",
            post(chat_handler)
                .fallback(method_not_allowed)
                .layer(chat_cors()),
        )
        .route("/api/getSources", post(get_sources))
        .route("/api/getParsedSources", post(get_parsed_sources))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
