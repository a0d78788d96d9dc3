// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Frame emitter
//
// Serializes text into the client's `data: {"text":...}\n\n` envelope, and
// owns the fixed user-facing notices sent in place of a model answer.

use bytes::Bytes;

use super::types::OutboundEvent;

impl OutboundEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Encode as one SSE frame.
    pub fn to_frame(&self) -> Bytes {
        let json = serde_json::json!({ "text": self.text });
        Bytes::from(format!("data: {json}\n\n"))
    }
}

/// Encode a filtered delta. Empty text produces no frame.
pub fn encode_text_event(text: &str) -> Option<Bytes> {
    if text.is_empty() {
        return None;
    }
    Some(OutboundEvent::new(text).to_frame())
}

/// Fixed messages shown to the user when no model answer can be streamed.
///
/// These are the only error texts that reach the client; upstream bodies and
/// internal error details are logged, never forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    AuthenticationFailed,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    InvalidRequest,
    MissingBody,
    BodyTooLarge,
    TechnicalDifficulties,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::AuthenticationFailed => {
                "\u{26a0}\u{fe0f} Authentication failed. Please check your API key."
            }
            Notice::RateLimited => "\u{26a0}\u{fe0f} Rate limit exceeded. Please try again later.",
            Notice::ServerError => "\u{26a0}\u{fe0f} Server error. Please try again.",
            Notice::ServiceUnavailable => "\u{26a0}\u{fe0f} AI service temporarily unavailable.",
            Notice::InvalidRequest => "\u{26a0}\u{fe0f} Invalid request format.",
            Notice::MissingBody => "\u{26a0}\u{fe0f} No request body found.",
            Notice::BodyTooLarge => {
                "\u{26a0}\u{fe0f} Request is too large. Please shorten the conversation and try again."
            }
            Notice::TechnicalDifficulties => {
                "\u{26a0}\u{fe0f} I'm experiencing some technical difficulties. Please try again in a moment."
            }
        }
    }

    pub fn to_frame(self) -> Bytes {
        OutboundEvent::new(self.text()).to_frame()
    }
}
