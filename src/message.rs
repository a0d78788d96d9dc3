// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Chat request types
//
// The browser posts `{ "messages": [{ "role": ..., "content": ... }] }`.
// The list is forwarded to the model unchanged, so only the shape is
// validated here.

use serde::{Deserialize, Serialize};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request body is empty")]
    EmptyBody,

    /// Body is not JSON at all. Carries the parser's message.
    #[error("{0}")]
    InvalidBody(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The body stream failed before it was fully read.
    #[error("failed to read request body: {0}")]
    Unreadable(String),

    /// JSON, but `messages` is missing, not an array, or holds bad entries.
    #[error("invalid messages: {0}")]
    InvalidMessages(String),
}

/// Parse a chat request body into its message list.
pub fn parse_chat_request(body: &[u8]) -> Result<Vec<ChatMessage>, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RequestError::EmptyBody);
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RequestError::InvalidBody(e.to_string()))?;

    let messages = match value.get("messages") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(RequestError::InvalidMessages(
                "`messages` must be an array".to_string(),
            ))
        }
        None => {
            return Err(RequestError::InvalidMessages(
                "`messages` is required".to_string(),
            ))
        }
    };

    messages
        .into_iter()
        .map(serde_json::from_value::<ChatMessage>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RequestError::InvalidMessages(e.to_string()))
}
