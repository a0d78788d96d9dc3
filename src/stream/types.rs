// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Upstream frames, the reasoning sentinel pair, the outbound event
// envelope, and the per-request pipeline settings.

use serde::{Deserialize, Serialize};

/// Payload that terminates an upstream stream.
pub const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Upstream frames
// ---------------------------------------------------------------------------

/// One `data:` event decoded from the provider's SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFrame {
    /// Everything after `data:`, multi-line payloads joined with `\n`.
    pub raw_payload: String,
}

/// What an upstream frame turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    /// The terminal `[DONE]` sentinel.
    Done,
    /// An incremental text delta. Empty when the frame carries no content
    /// (role announcements, finish markers, usage frames).
    Delta(String),
    /// Not JSON, or JSON of the wrong shape. Carries the parser message.
    Malformed(String),
}

impl UpstreamFrame {
    pub fn new(raw_payload: impl Into<String>) -> Self {
        Self {
            raw_payload: raw_payload.into(),
        }
    }

    /// Classify the payload and pull out `choices[0].delta.content`.
    ///
    /// Every level of that path is optional: a missing `choices`, an empty
    /// array, a null `delta` or a null `content` all yield an empty delta.
    pub fn classify(&self) -> FramePayload {
        let payload = self.raw_payload.trim();
        if payload == DONE_SENTINEL {
            return FramePayload::Done;
        }

        match serde_json::from_str::<CompletionChunk>(payload) {
            Ok(chunk) => FramePayload::Delta(chunk.into_delta_text()),
            Err(e) => FramePayload::Malformed(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    choices: Option<Vec<ChunkChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl CompletionChunk {
    fn into_delta_text(self) -> String {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Reasoning sentinels
// ---------------------------------------------------------------------------

/// The literal start/end markers around model reasoning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningTags {
    start: String,
    end: String,
}

impl ReasoningTags {
    /// Both tags must be non-empty and distinct.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self, String> {
        let start = start.into();
        let end = end.into();
        if start.is_empty() || end.is_empty() {
            return Err("reasoning tags must not be empty".to_string());
        }
        if start == end {
            return Err(format!(
                "reasoning start and end tags must differ, both are \"{start}\""
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

impl Default for ReasoningTags {
    fn default() -> Self {
        Self {
            start: "<think>".to_string(),
            end: "</think>".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// The envelope the browser client reads: `data: {"text":"..."}\n\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything one pipeline instance needs. Cloned into each request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub tags: ReasoningTags,
    /// Number of leading frames in which newline-bearing deltas are dropped.
    pub leading_newline_window: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tags: ReasoningTags::default(),
            leading_newline_window: 2,
        }
    }
}
