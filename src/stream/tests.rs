// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Pipeline and processor tests
//
// Covers:
//  1. Plain deltas forwarded in order, stream closes after [DONE]
//  2. Reasoning tags split across upstream frames
//  3. Unterminated reasoning at [DONE] produces nothing
//  4. Leading-newline window
//  5. Malformed frames skipped without aborting
//  6. [DONE] discards buffered leftovers and later frames
//  7. Frame bytes split at arbitrary points give identical output
//  8. Two isolated pipelines over the same bytes agree
//  9. Client disconnect stops the upstream read
// 10. Maximum duration aborts a stalled upstream
// 11. Upstream read error before/after first frame

use super::*;
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One upstream SSE frame carrying `content` as its delta.
fn delta_frame(content: &str) -> String {
    let json = serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }]
    });
    format!("data: {json}\n\n")
}

fn done_frame() -> String {
    "data: [DONE]\n\n".to_string()
}

/// Upstream body made of the given deltas followed by [DONE].
fn upstream_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| delta_frame(d)).collect();
    body.push_str(&done_frame());
    body
}

fn chunks_of(parts: Vec<String>) -> impl tokio_stream::Stream<Item = Result<Bytes, Infallible>> + Unpin + Send {
    tokio_stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))).collect::<Vec<_>>())
}

fn settings() -> PipelineSettings {
    PipelineSettings::default()
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(60)
}

/// Run the synchronous pipeline over physical chunks.
fn run_pipeline(chunks: &[&[u8]]) -> Vec<Bytes> {
    let mut pipeline = Pipeline::new(&settings());
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(pipeline.push_chunk(chunk));
        if pipeline.is_done() {
            break;
        }
    }
    out.extend(pipeline.finish());
    out
}

fn texts(frames: &[Bytes]) -> Vec<String> {
    frames
        .iter()
        .map(|f| {
            let s = std::str::from_utf8(f).expect("frames are UTF-8");
            let json = s
                .strip_prefix("data: ")
                .and_then(|rest| rest.strip_suffix("\n\n"))
                .unwrap_or_else(|| panic!("bad frame envelope: {s:?}"));
            serde_json::from_str::<OutboundEvent>(json)
                .expect("frame payload is an OutboundEvent")
                .text
        })
        .collect()
}

async fn collect(stream: ReceiverStream<Bytes>) -> Vec<Bytes> {
    stream.collect().await
}

// ---------------------------------------------------------------------------
// 1. Plain deltas
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hello_world_forwarded_in_order() {
    let processor = StreamProcessor::new(settings());
    let body = upstream_body(&["Hello", " world"]);

    let frames = collect(processor.process_until(chunks_of(vec![body]), deadline())).await;

    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[0][..], b"data: {\"text\":\"Hello\"}\n\n");
    assert_eq!(&frames[1][..], b"data: {\"text\":\" world\"}\n\n");
}

#[test]
fn empty_and_role_only_deltas_emit_nothing() {
    let body = format!(
        "data: {}\n\n{}{}",
        r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#,
        delta_frame("Hi"),
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n"
    );
    let frames = run_pipeline(&[body.as_bytes()]);
    assert_eq!(texts(&frames), vec!["Hi"]);
}

// ---------------------------------------------------------------------------
// 2. Reasoning tags split across frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn split_reasoning_tags_only_visible_text_reaches_client() {
    let processor = StreamProcessor::new(settings());
    let parts = vec![
        delta_frame("<thi"),
        delta_frame("nk>secret</th"),
        delta_frame("ink>visible"),
        done_frame(),
    ];

    let frames = collect(processor.process_until(chunks_of(parts), deadline())).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0][..], b"data: {\"text\":\"visible\"}\n\n");
}

#[test]
fn one_byte_tag_split_never_leaks_sentinel() {
    for tag in ["<think>", "</think>"] {
        let (head, tail) = tag.split_at(1);
        let deltas = if tag == "<think>" {
            vec!["a", head, tail, "hidden</think>b"]
        } else {
            vec!["a<think>hidden", head, tail, "b"]
        };
        let body = upstream_body(&deltas);
        let out = texts(&run_pipeline(&[body.as_bytes()]));
        for text in &out {
            assert!(!text.contains("<think>") && !text.contains("</think>"), "{text:?}");
            assert!(!text.contains("hidden"), "{text:?}");
        }
        assert_eq!(out.concat(), "ab");
    }
}

#[test]
fn emitted_text_equals_input_with_spans_removed() {
    let deltas = [
        "Let me ",
        "<think>The user wants",
        " a summary.</think>",
        "Here is ",
        "the summary. <thi",
        "nk>again</think>Done.",
    ];
    let body = upstream_body(&deltas);
    let out = texts(&run_pipeline(&[body.as_bytes()])).concat();
    assert_eq!(out, "Let me Here is the summary. Done.");
}

// ---------------------------------------------------------------------------
// 3. Unterminated reasoning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unterminated_reasoning_at_done_yields_no_frames() {
    let processor = StreamProcessor::new(settings());
    let body = upstream_body(&["<think>unfinished"]);

    let frames = collect(processor.process_until(chunks_of(vec![body]), deadline())).await;

    assert!(frames.is_empty(), "got {:?}", texts(&frames));
}

#[test]
fn visible_text_before_unterminated_span_is_kept() {
    let body = upstream_body(&["Answer: 42", "<think>but wait"]);
    assert_eq!(texts(&run_pipeline(&[body.as_bytes()])), vec!["Answer: 42"]);
}

// ---------------------------------------------------------------------------
// 4. Leading newlines
// ---------------------------------------------------------------------------

#[test]
fn leading_newline_window_drops_first_two_newline_frames() {
    let body = upstream_body(&["\n\n", "\nHi", "\nThere"]);
    assert_eq!(texts(&run_pipeline(&[body.as_bytes()])), vec!["\nThere"]);
}

#[test]
fn newline_window_counts_forwarded_frames_too() {
    let body = upstream_body(&["Hello", "World", "\n\nNext"]);
    assert_eq!(
        texts(&run_pipeline(&[body.as_bytes()])),
        vec!["Hello", "World", "\n\nNext"]
    );
}

#[test]
fn newline_suppression_runs_before_reasoning_filter() {
    // The second frame opens a span but also carries a newline inside the
    // window, so it is dropped whole and the tag never reaches the filter.
    let body = upstream_body(&["A", "<think>\n", "B"]);
    assert_eq!(texts(&run_pipeline(&[body.as_bytes()])), vec!["A", "B"]);
}

// ---------------------------------------------------------------------------
// 5. Malformed frames
// ---------------------------------------------------------------------------

#[test]
fn malformed_frame_is_skipped_and_stream_continues() {
    let body = format!(
        "{}data: {{not json\n\n{}{}",
        delta_frame("one"),
        delta_frame("two"),
        done_frame()
    );
    let mut pipeline = Pipeline::new(&settings());
    let mut frames = pipeline.push_chunk(body.as_bytes());
    frames.extend(pipeline.finish());

    assert_eq!(texts(&frames), vec!["one", "two"]);
    assert_eq!(pipeline.malformed_frames(), 1);
}

#[test]
fn malformed_frames_do_not_advance_newline_window() {
    let body = format!(
        "data: garbage\n\n{}{}{}",
        delta_frame("\n"),
        delta_frame("\nstill dropped"),
        done_frame()
    );
    assert!(run_pipeline(&[body.as_bytes()]).is_empty());
}

#[test]
fn missing_choices_counts_as_empty_delta() {
    let body = format!(
        "data: {}\n\n{}{}",
        r#"{"usage":{"total_tokens":12}}"#,
        delta_frame("x"),
        done_frame()
    );
    assert_eq!(texts(&run_pipeline(&[body.as_bytes()])), vec!["x"]);
}

// ---------------------------------------------------------------------------
// 6. [DONE] terminates immediately
// ---------------------------------------------------------------------------

#[test]
fn done_ignores_trailing_frames_and_partial_data() {
    let body = format!(
        "{}{}{}data: {{\"choices\":[{{\"del",
        delta_frame("kept"),
        done_frame(),
        delta_frame("after done"),
    );
    let mut pipeline = Pipeline::new(&settings());
    let mut frames = pipeline.push_chunk(body.as_bytes());
    assert!(pipeline.is_done());
    frames.extend(pipeline.push_chunk(delta_frame("later chunk").as_bytes()));
    frames.extend(pipeline.finish());

    assert_eq!(texts(&frames), vec!["kept"]);
}

#[tokio::test]
async fn upstream_eof_without_done_flushes_held_text() {
    let processor = StreamProcessor::new(settings());
    let parts = vec![delta_frame("Hello"), delta_frame(" <th")];

    let frames = collect(processor.process_until(chunks_of(parts), deadline())).await;

    assert_eq!(texts(&frames), vec!["Hello", " ", "<th"]);
}

// ---------------------------------------------------------------------------
// 7. Arbitrary physical chunking
// ---------------------------------------------------------------------------

#[test]
fn output_is_independent_of_chunk_boundaries() {
    let body = upstream_body(&["Hi ", "<think>plan", "</think>", "caf\u{e9} \u{2615}"]);
    let bytes = body.as_bytes();
    let expected = texts(&run_pipeline(&[bytes])).concat();
    assert_eq!(expected, "Hi caf\u{e9} \u{2615}");

    for cut in 1..bytes.len() {
        let out = texts(&run_pipeline(&[&bytes[..cut], &bytes[cut..]])).concat();
        assert_eq!(out, expected, "cut at byte {cut}");
    }

    let singles: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(texts(&run_pipeline(&singles)).concat(), expected);
}

// ---------------------------------------------------------------------------
// 8. Isolation / idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_pipelines_over_same_bytes_are_identical() {
    let body = upstream_body(&["\n", "A<think>x</think>", "B", "\nC"]);
    let processor = StreamProcessor::new(settings());

    let first = collect(processor.process_until(chunks_of(vec![body.clone()]), deadline())).await;
    let second = collect(processor.process_until(chunks_of(vec![body]), deadline())).await;

    assert_eq!(first, second);
    assert_eq!(texts(&first), vec!["A", "B", "\nC"]);
}

// ---------------------------------------------------------------------------
// 9. Client disconnect
// ---------------------------------------------------------------------------

/// Upstream that never ends; records when it is dropped.
struct EndlessUpstream {
    dropped: Arc<AtomicBool>,
    rx: ReceiverStream<Result<Bytes, Infallible>>,
}

impl tokio_stream::Stream for EndlessUpstream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for EndlessUpstream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn client_disconnect_drops_upstream() {
    let dropped = Arc::new(AtomicBool::new(false));
    let (up_tx, up_rx) = tokio::sync::mpsc::channel(4);
    let upstream = EndlessUpstream {
        dropped: dropped.clone(),
        rx: ReceiverStream::new(up_rx),
    };

    let processor = StreamProcessor::new(settings());
    let mut out = processor.process_until(upstream, deadline());

    up_tx.send(Ok(Bytes::from(delta_frame("first")))).await.unwrap();
    let first = out.next().await.unwrap();
    assert_eq!(texts(&[first]), vec!["first"]);

    // Client goes away while upstream is still open.
    drop(out);

    tokio::time::timeout(Duration::from_secs(2), async {
        while !dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("upstream should be released after client disconnect");
}

// ---------------------------------------------------------------------------
// 10. Maximum duration
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stalled_upstream_is_aborted_at_deadline() {
    let (up_tx, up_rx) = tokio::sync::mpsc::channel::<Result<Bytes, Infallible>>(4);
    let processor = StreamProcessor::new(settings());
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut out = processor.process_until(ReceiverStream::new(up_rx), deadline);

    up_tx.send(Ok(Bytes::from(delta_frame("partial")))).await.unwrap();
    assert_eq!(texts(&[out.next().await.unwrap()]), vec!["partial"]);

    // Upstream stays open but silent; the paused clock auto-advances.
    assert!(out.next().await.is_none(), "stream should close at the deadline");
    assert!(up_tx.is_closed(), "upstream receiver should be dropped");
}

#[tokio::test(start_paused = true)]
async fn blocked_client_send_is_aborted_at_deadline() {
    let dropped = Arc::new(AtomicBool::new(false));
    let (up_tx, up_rx) = tokio::sync::mpsc::channel(4);
    let upstream = EndlessUpstream {
        dropped: dropped.clone(),
        rx: ReceiverStream::new(up_rx),
    };

    let processor = StreamProcessor::new(settings());
    let deadline = Instant::now() + Duration::from_secs(5);
    // Held but never read: the outbound channel fills and sends block.
    let _out = processor.process_until(upstream, deadline);

    let many: String = (0..200).map(|i| delta_frame(&format!("t{i}"))).collect();
    up_tx.send(Ok(Bytes::from(many))).await.unwrap();

    tokio::time::sleep(Duration::from_secs(6)).await;
    tokio::time::timeout(Duration::from_secs(1), async {
        while !dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("upstream should be released once the deadline passes");
}

// ---------------------------------------------------------------------------
// 11. Upstream read errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_error_before_any_frame_sends_unavailable_notice() {
    let parts: Vec<Result<Bytes, String>> = vec![Err("connection reset".to_string())];
    let processor = StreamProcessor::new(settings());

    let frames = collect(processor.process_until(tokio_stream::iter(parts), deadline())).await;

    assert_eq!(texts(&frames), vec![Notice::ServiceUnavailable.text()]);
}

#[tokio::test]
async fn read_error_after_frames_just_closes() {
    let parts: Vec<Result<Bytes, String>> = vec![
        Ok(Bytes::from(delta_frame("partial answer"))),
        Err("connection reset".to_string()),
        Ok(Bytes::from(delta_frame("never read"))),
    ];
    let processor = StreamProcessor::new(settings());

    let frames = collect(processor.process_until(tokio_stream::iter(parts), deadline())).await;

    assert_eq!(texts(&frames), vec!["partial answer"]);
}
