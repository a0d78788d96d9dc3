// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Chat engine
//
// Turns one chat request into the client's outbound frame stream:
// - Build the completion payload from config (model, sampling params)
// - Send it upstream through the injected HttpSender
// - Non-success status: log status and body, send one translated notice
// - Success: run the body through the StreamProcessor

mod translate;

pub use translate::notice_for_status;

use crate::config::{Config, GenerationParams, UpstreamConfig};
use crate::message::ChatMessage;
use crate::proxy::{ChatBackend, FrameStream};
use crate::stream::{Notice, StreamProcessor};
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::TryStreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Upstream error bodies are logged up to this many bytes.
const MAX_LOGGED_ERROR_BODY: usize = 4 * 1024;

// ---------------------------------------------------------------------------
// Request context for structured logging
// ---------------------------------------------------------------------------

struct RequestContext {
    request_id: String,
    config_hash: String,
    model: String,
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Sends HTTP requests to the upstream provider.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub enum HttpBody {
    Full(Bytes),
    Stream(Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>),
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: HttpBody,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to encode completion request: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid header value for {name}")]
    InvalidHeader { name: &'static str },
}

// ---------------------------------------------------------------------------
// Engine dependencies
// ---------------------------------------------------------------------------

pub struct EngineDeps {
    pub config: Arc<Config>,
    pub http: Arc<dyn HttpSender>,
}

// ---------------------------------------------------------------------------
// ChatEngine
// ---------------------------------------------------------------------------

/// Chat backend that streams filtered completions from the upstream provider.
pub struct ChatEngine {
    deps: EngineDeps,
    processor: StreamProcessor,
}

impl ChatEngine {
    pub fn new_with(deps: EngineDeps) -> Self {
        let processor = StreamProcessor::new(deps.config.stream.pipeline_settings());
        Self { deps, processor }
    }
}

#[async_trait]
impl ChatBackend for ChatEngine {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> FrameStream {
        let upstream = &self.deps.config.upstream;
        let ctx = RequestContext {
            request_id: Uuid::new_v4().to_string(),
            config_hash: self.deps.config.config_hash.clone(),
            model: upstream.model.clone(),
        };

        let span = tracing::info_span!(
            "chat",
            request_id = %ctx.request_id,
            config_hash = %ctx.config_hash,
            model = %ctx.model,
        );

        self.run(messages, ctx).instrument(span).await
    }
}

impl ChatEngine {
    async fn run(&self, messages: Vec<ChatMessage>, ctx: RequestContext) -> FrameStream {
        let upstream = &self.deps.config.upstream;
        tracing::debug!(
            request_id = %ctx.request_id,
            messages = messages.len(),
            "processing chat request"
        );

        let request = match build_request(upstream, &messages) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id, error = %e, "failed to build upstream request");
                return single_notice(Notice::TechnicalDifficulties);
            }
        };

        let started = Instant::now();
        let max_duration = self.deps.config.stream.max_duration;
        let deadline = started + max_duration;
        let response = match timeout_at(deadline, self.deps.http.send(request)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::error!(request_id = %ctx.request_id, error = %e, "upstream request failed");
                return single_notice(Notice::ServiceUnavailable);
            }
            Err(_) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    max_duration_secs = max_duration.as_secs(),
                    "upstream did not answer within maximum duration"
                );
                return single_notice(Notice::ServiceUnavailable);
            }
        };
        let connect_ms = started.elapsed().as_secs_f64() * 1000.0;

        if !response.status.is_success() {
            let body = timeout_at(deadline, read_error_body(response.body))
                .await
                .unwrap_or_else(|_| "<error body read timed out>".to_string());
            tracing::error!(
                request_id = %ctx.request_id,
                config_hash = %ctx.config_hash,
                model = %ctx.model,
                status = response.status.as_u16(),
                body = %body,
                latency_ms = connect_ms,
                "upstream returned error status"
            );
            return single_notice(notice_for_status(response.status));
        }

        tracing::info!(
            request_id = %ctx.request_id,
            status = response.status.as_u16(),
            latency_ms = connect_ms,
            "upstream stream opened"
        );

        let frames = match response.body {
            HttpBody::Stream(body) => self.processor.process_until(body, deadline),
            HttpBody::Full(bytes) => self
                .processor
                .process_until(stream::iter(vec![Ok::<_, HttpError>(bytes)]), deadline),
        };
        Box::pin(frames)
    }
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let resp = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp
            .bytes_stream()
            .map_err(|e| HttpError::Transport(e.to_string()));

        Ok(HttpResponse {
            status,
            headers,
            body: HttpBody::Stream(Box::pin(stream)),
        })
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default engine
// ---------------------------------------------------------------------------

pub fn build_chat_engine(config: Arc<Config>, client: reqwest::Client) -> ChatEngine {
    ChatEngine::new_with(EngineDeps {
        config,
        http: Arc::new(ReqwestHttpSender::new(client)),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(flatten)]
    generation: GenerationParams,
}

fn build_request(
    upstream: &UpstreamConfig,
    messages: &[ChatMessage],
) -> Result<HttpRequest, EngineError> {
    let payload = CompletionRequest {
        model: &upstream.model,
        messages,
        stream: true,
        generation: upstream.generation,
    };
    let body = serde_json::to_vec(&payload)?;

    Ok(HttpRequest {
        url: completions_url(upstream.effective_base_url()),
        headers: build_headers(upstream)?,
        body: Bytes::from(body),
    })
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn build_headers(upstream: &UpstreamConfig) -> Result<HeaderMap, EngineError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        reqwest::header::AUTHORIZATION,
        bearer("Authorization", upstream.api_key.expose())?,
    );
    if let Some(obs) = &upstream.observability {
        headers.insert("helicone-auth", bearer("Helicone-Auth", obs.api_key.expose())?);
    }
    Ok(headers)
}

fn bearer(name: &'static str, key: &str) -> Result<HeaderValue, EngineError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|_| EngineError::InvalidHeader { name })?;
    value.set_sensitive(true);
    Ok(value)
}

fn single_notice(notice: Notice) -> FrameStream {
    Box::pin(stream::iter(vec![notice.to_frame()]))
}

/// Read at most `MAX_LOGGED_ERROR_BODY` bytes of an error body for logging.
async fn read_error_body(body: HttpBody) -> String {
    let bytes = match body {
        HttpBody::Full(b) => b.to_vec(),
        HttpBody::Stream(mut s) => {
            let mut collected = Vec::new();
            while let Some(chunk) = s.next().await {
                match chunk {
                    Ok(bytes) => {
                        collected.extend_from_slice(&bytes);
                        if collected.len() >= MAX_LOGGED_ERROR_BODY {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "error body read failed");
                        break;
                    }
                }
            }
            collected
        }
    };
    let end = bytes.len().min(MAX_LOGGED_ERROR_BODY);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
