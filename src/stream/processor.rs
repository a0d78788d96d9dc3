// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Stream processor
//
// Drives a `Pipeline` over an upstream byte stream on its own task and hands
// the outbound frames to the HTTP response through a bounded channel.
// Suspends only on the upstream read and the outbound send.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::Instrument;

use super::emitter::Notice;
use super::pipeline::Pipeline;
use super::types::PipelineSettings;

/// Outbound frames buffered between the pipeline task and the response body.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Why a pipeline run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// `[DONE]` received.
    Done,
    /// Upstream body ended without `[DONE]`.
    UpstreamClosed,
    /// Upstream read failed mid-stream.
    UpstreamError,
    /// The client went away; upstream reading stopped.
    ClientGone,
    /// The response ran past the configured maximum duration.
    DeadlineExceeded,
}

/// Spawns one isolated pipeline per upstream response.
#[derive(Debug, Clone)]
pub struct StreamProcessor {
    settings: PipelineSettings,
}

impl StreamProcessor {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process an upstream body, producing the client's outbound frames.
    ///
    /// Upstream reads and outbound sends are bounded by `deadline`; past it
    /// the upstream body is dropped and the stream closes.
    ///
    /// The returned stream ends when the pipeline finishes. Dropping it stops
    /// the upstream read and drops `input`, releasing the upstream connection.
    /// A panic inside the pipeline becomes a single "technical difficulties"
    /// frame instead of a silently truncated response.
    pub fn process_until<S, E>(&self, input: S, deadline: Instant) -> ReceiverStream<Bytes>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Bytes>(OUTBOUND_CHANNEL_CAPACITY);
        let settings = self.settings.clone();
        let span = tracing::Span::current();

        tokio::spawn(
            async move {
                let guard_tx = tx.clone();
                let outcome = AssertUnwindSafe(run_pipeline(settings, input, deadline, tx))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok((end, frames)) => {
                        tracing::debug!(end = ?end, frames_emitted = frames, "stream finished");
                    }
                    Err(_) => {
                        tracing::error!("stream pipeline panicked");
                        let _ = guard_tx.send(Notice::TechnicalDifficulties.to_frame()).await;
                    }
                }
            }
            .instrument(span),
        );

        ReceiverStream::new(rx)
    }
}

async fn run_pipeline<S, E>(
    settings: PipelineSettings,
    mut input: S,
    deadline: Instant,
    tx: mpsc::Sender<Bytes>,
) -> (StreamEnd, usize)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut pipeline = Pipeline::new(&settings);

    let end = loop {
        let next = tokio::select! {
            _ = tx.closed() => break StreamEnd::ClientGone,
            read = timeout_at(deadline, input.next()) => read,
        };

        let chunk = match next {
            Err(_) => break StreamEnd::DeadlineExceeded,
            Ok(None) => break StreamEnd::UpstreamClosed,
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "upstream read failed");
                if pipeline.frames_emitted() == 0 {
                    let _ = timeout_at(deadline, tx.send(Notice::ServiceUnavailable.to_frame())).await;
                }
                break StreamEnd::UpstreamError;
            }
            Ok(Some(Ok(chunk))) => chunk,
        };

        match timeout_at(deadline, send_all(&tx, pipeline.push_chunk(&chunk))).await {
            Err(_) => break StreamEnd::DeadlineExceeded,
            Ok(false) => break StreamEnd::ClientGone,
            Ok(true) => {}
        }
        if pipeline.is_done() {
            break StreamEnd::Done;
        }
    };

    // Release the upstream connection before flushing the tail.
    drop(input);

    if matches!(end, StreamEnd::Done | StreamEnd::UpstreamClosed)
        && timeout_at(deadline, send_all(&tx, pipeline.finish())).await.is_err()
    {
        tracing::warn!("stream exceeded maximum duration while flushing");
    }
    if end == StreamEnd::DeadlineExceeded {
        tracing::warn!("stream exceeded maximum duration; aborting");
    }
    if pipeline.malformed_frames() > 0 {
        tracing::warn!(
            malformed_frames = pipeline.malformed_frames(),
            "upstream stream contained malformed frames"
        );
    }

    (end, pipeline.frames_emitted())
}

/// Returns false once the receiver is gone.
async fn send_all(tx: &mpsc::Sender<Bytes>, frames: Vec<Bytes>) -> bool {
    for frame in frames {
        if tx.send(frame).await.is_err() {
            tracing::debug!("client disconnected");
            return false;
        }
    }
    true
}
