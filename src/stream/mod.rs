// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Streaming response pipeline
//
// Responsibilities:
// - Re-frame the provider's SSE body into complete `data:` events
// - Extract `choices[0].delta.content`, skipping malformed frames
// - Drop newline padding in the first frames of a response
// - Strip reasoning spans, including tags split across chunks
// - Emit `data: {"text":...}\n\n` frames for the browser client
// - Stop reading upstream when the client disconnects or time runs out

mod emitter;
mod filter;
mod newline;
mod pipeline;
mod processor;
mod reframer;
mod types;

pub use emitter::{encode_text_event, Notice};
pub use filter::{FilterFlush, FilterState, ReasoningFilter};
pub use newline::LeadingNewlineSuppressor;
pub use pipeline::Pipeline;
pub use processor::{StreamEnd, StreamProcessor};
pub use reframer::SseFrameParser;
pub use types::{
    FramePayload, OutboundEvent, PipelineSettings, ReasoningTags, UpstreamFrame, DONE_SENTINEL,
};

#[cfg(test)]
mod tests;
