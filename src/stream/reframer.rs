// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Chunk reframer
//
// Turns arbitrarily split upstream body chunks into complete SSE `data`
// events. Bytes are buffered up to the next line feed before decoding, so a
// UTF-8 sequence split across two network chunks is never mangled.

use super::types::UpstreamFrame;

/// Incremental parser for the provider's `text/event-stream` body.
///
/// Only `data` fields are kept. Comment lines (`: keep-alive`) and the
/// `event`, `id` and `retry` fields are ignored. A blank line dispatches the
/// accumulated data as one [`UpstreamFrame`].
#[derive(Debug, Default)]
pub struct SseFrameParser {
    /// Bytes after the last line feed seen.
    line_buffer: Vec<u8>,
    /// Data lines of the event currently being assembled.
    data: Option<String>,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one physical chunk; returns every frame it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<UpstreamFrame> {
        self.line_buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.line_buffer[consumed..]
            .iter()
            .position(|&b| b == b'\n')
        {
            let end = consumed + offset;
            let mut line = &self.line_buffer[consumed..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let line = String::from_utf8_lossy(line).into_owned();
            consumed = end + 1;

            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        self.line_buffer.drain(..consumed);

        frames
    }

    /// True while part of an event is buffered.
    pub fn has_partial_frame(&self) -> bool {
        !self.line_buffer.is_empty() || self.data.is_some()
    }

    /// Drop whatever incomplete event is still buffered.
    pub fn discard(&mut self) {
        self.line_buffer.clear();
        self.data = None;
    }

    fn process_line(&mut self, line: &str) -> Option<UpstreamFrame> {
        if line.is_empty() {
            return self.data.take().map(UpstreamFrame::new);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}
