// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Synchronous per-response pipeline:
// bytes -> reframer -> leading-newline suppressor -> reasoning filter -> emitter

use bytes::Bytes;

use super::emitter::encode_text_event;
use super::filter::ReasoningFilter;
use super::newline::LeadingNewlineSuppressor;
use super::reframer::SseFrameParser;
use super::types::{FramePayload, PipelineSettings};

/// All mutable state for one response. Constructed per request, never shared.
#[derive(Debug)]
pub struct Pipeline {
    parser: SseFrameParser,
    suppressor: LeadingNewlineSuppressor,
    filter: ReasoningFilter,
    done: bool,
    frames_emitted: usize,
    malformed_frames: usize,
}

impl Pipeline {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            parser: SseFrameParser::new(),
            suppressor: LeadingNewlineSuppressor::new(settings.leading_newline_window),
            filter: ReasoningFilter::new(settings.tags.clone()),
            done: false,
            frames_emitted: 0,
            malformed_frames: 0,
        }
    }

    /// Process one upstream body chunk and return the outbound frames it
    /// produced. Once `[DONE]` has been seen, further input is ignored.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        if self.done {
            return Vec::new();
        }

        let mut out = Vec::new();
        for frame in self.parser.feed(chunk) {
            match frame.classify() {
                FramePayload::Done => {
                    self.done = true;
                    if self.parser.has_partial_frame() {
                        tracing::debug!("discarding buffered data after [DONE]");
                    }
                    self.parser.discard();
                    break;
                }
                FramePayload::Malformed(reason) => {
                    self.malformed_frames += 1;
                    tracing::warn!(
                        reason = %reason,
                        payload_len = frame.raw_payload.len(),
                        "skipping malformed upstream frame"
                    );
                }
                FramePayload::Delta(delta) => {
                    if !self.suppressor.admit(&delta) {
                        continue;
                    }
                    let visible = self.filter.push(&delta);
                    if let Some(bytes) = encode_text_event(&visible) {
                        self.frames_emitted += 1;
                        out.push(bytes);
                    }
                }
            }
        }
        out
    }

    /// End of stream (after `[DONE]` or upstream EOF). Releases held-back
    /// visible text; an unterminated reasoning span is dropped.
    pub fn finish(&mut self) -> Vec<Bytes> {
        self.done = true;
        if self.parser.has_partial_frame() {
            tracing::debug!("discarding incomplete trailing upstream frame");
        }
        self.parser.discard();

        let flush = self.filter.finish();
        if flush.unterminated {
            tracing::debug!("stream ended inside a reasoning span; remainder discarded");
        }

        match encode_text_event(&flush.text) {
            Some(bytes) => {
                self.frames_emitted += 1;
                vec![bytes]
            }
            None => Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn frames_emitted(&self) -> usize {
        self.frames_emitted
    }

    pub fn malformed_frames(&self) -> usize {
        self.malformed_frames
    }
}
