// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

// Reasoning filter
//
// Two-state machine that removes everything between the reasoning start
// and end tags, including the tags. Tags may straddle any number of delta
// boundaries: the carry-over keeps the longest suffix that could still grow
// into the tag being searched for, which is never longer than the tag
// minus one byte.

use super::types::ReasoningTags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Visible text; searching for the start tag.
    Outside,
    /// Reasoning text; searching for the end tag.
    Inside,
}

/// Result of closing the filter at end of stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFlush {
    /// Held-back visible text that turned out not to be a tag.
    pub text: String,
    /// The stream ended inside a reasoning span.
    pub unterminated: bool,
}

#[derive(Debug, Clone)]
pub struct ReasoningFilter {
    tags: ReasoningTags,
    state: FilterState,
    carry: String,
}

impl ReasoningFilter {
    pub fn new(tags: ReasoningTags) -> Self {
        Self {
            tags,
            state: FilterState::Outside,
            carry: String::new(),
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Bytes currently held back awaiting the next delta.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Feed one delta; returns the text that is safe to show now.
    pub fn push(&mut self, delta: &str) -> String {
        let mut working = std::mem::take(&mut self.carry);
        working.push_str(delta);

        let mut visible = String::new();
        let mut rest = working.as_str();

        loop {
            match self.state {
                FilterState::Outside => {
                    let start = self.tags.start();
                    match rest.find(start) {
                        Some(i) => {
                            visible.push_str(&rest[..i]);
                            rest = &rest[i + start.len()..];
                            self.state = FilterState::Inside;
                        }
                        None => {
                            let keep = rest.len() - partial_tag_suffix(rest, start);
                            visible.push_str(&rest[..keep]);
                            self.carry = rest[keep..].to_string();
                            break;
                        }
                    }
                }
                FilterState::Inside => {
                    let end = self.tags.end();
                    match rest.find(end) {
                        Some(j) => {
                            rest = &rest[j + end.len()..];
                            self.state = FilterState::Outside;
                        }
                        None => {
                            let keep = rest.len() - partial_tag_suffix(rest, end);
                            self.carry = rest[keep..].to_string();
                            break;
                        }
                    }
                }
            }
        }

        visible
    }

    /// Close the filter. Held-back text outside a span is released; anything
    /// inside an unterminated span is dropped.
    pub fn finish(&mut self) -> FilterFlush {
        let carry = std::mem::take(&mut self.carry);
        match self.state {
            FilterState::Outside => FilterFlush {
                text: carry,
                unterminated: false,
            },
            FilterState::Inside => FilterFlush {
                text: String::new(),
                unterminated: true,
            },
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    let longest = text.len().min(tag.len().saturating_sub(1));
    (1..=longest)
        .rev()
        .find(|&k| tag.is_char_boundary(k) && text.ends_with(&tag[..k]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ReasoningFilter {
        ReasoningFilter::new(ReasoningTags::default())
    }

    fn run(deltas: &[&str]) -> String {
        let mut f = filter();
        let mut out: String = deltas.iter().map(|d| f.push(d)).collect();
        out.push_str(&f.finish().text);
        out
    }

    #[test]
    fn plain_text_passes_through_immediately() {
        let mut f = filter();
        assert_eq!(f.push("Hello"), "Hello");
        assert_eq!(f.push(" world"), " world");
        assert_eq!(f.carry_len(), 0);
    }

    #[test]
    fn span_in_one_delta_is_removed() {
        assert_eq!(run(&["a<think>hidden</think>b"]), "ab");
    }

    #[test]
    fn tags_split_across_deltas() {
        let mut f = filter();
        assert_eq!(f.push("<thi"), "");
        assert_eq!(f.push("nk>secret</th"), "");
        assert_eq!(f.state(), FilterState::Inside);
        assert_eq!(f.push("ink>visible"), "visible");
        assert_eq!(f.state(), FilterState::Outside);
    }

    #[test]
    fn start_tag_split_at_every_position() {
        let text = "before<think>reasoning</think>after";
        for cut in 1..text.len() {
            let out = run(&[&text[..cut], &text[cut..]]);
            assert_eq!(out, "beforeafter", "cut at {cut}");
        }
    }

    #[test]
    fn every_three_way_split_gives_same_output() {
        let text = "x<think>a</think>y<think>b</think>z";
        for i in 1..text.len() {
            for j in i..text.len() {
                let out = run(&[&text[..i], &text[i..j], &text[j..]]);
                assert_eq!(out, "xyz", "cuts at {i},{j}");
            }
        }
    }

    #[test]
    fn byte_by_byte_never_leaks_tag_text() {
        let text = "Intro <think>hidden plan</think>Answer";
        let mut f = filter();
        let mut out = String::new();
        for ch in text.chars() {
            let piece = f.push(&ch.to_string());
            assert!(!piece.contains('<'), "leaked {piece:?}");
            out.push_str(&piece);
        }
        out.push_str(&f.finish().text);
        assert_eq!(out, "Intro Answer");
    }

    #[test]
    fn multiple_spans_in_one_delta() {
        assert_eq!(run(&["1<think>a</think>2<think>b</think>3"]), "123");
    }

    #[test]
    fn unterminated_span_is_dropped_silently() {
        let mut f = filter();
        assert_eq!(f.push("<think>unfinished"), "");
        let flush = f.finish();
        assert_eq!(flush.text, "");
        assert!(flush.unterminated);
    }

    #[test]
    fn partial_start_at_end_of_stream_is_released() {
        let mut f = filter();
        assert_eq!(f.push("a <thi"), "a ");
        let flush = f.finish();
        assert_eq!(flush.text, "<thi");
        assert!(!flush.unterminated);
    }

    #[test]
    fn lookalike_prefix_is_released_once_disproved() {
        let mut f = filter();
        assert_eq!(f.push("x <th"), "x ");
        assert_eq!(f.push("ree"), "<three");
    }

    #[test]
    fn carry_never_exceeds_tag_minus_one() {
        let mut f = filter();
        f.push("<think");
        assert_eq!(f.carry_len(), "<think>".len() - 1);
        f.push("><think>"); // start matched; now inside, carry holds nothing useful
        f.push("</think");
        assert_eq!(f.carry_len(), "</think>".len() - 1);
    }

    #[test]
    fn stray_end_tag_outside_span_is_plain_text() {
        assert_eq!(run(&["a</think>b"]), "a</think>b");
    }

    #[test]
    fn multibyte_text_next_to_tags() {
        assert_eq!(run(&["\u{e9}t\u{e9}<thi", "nk>\u{1f914}</think>\u{2713}"]), "\u{e9}t\u{e9}\u{2713}");
    }

    #[test]
    fn custom_tags() {
        let tags = ReasoningTags::new("[[r]]", "[[/r]]").unwrap();
        let mut f = ReasoningFilter::new(tags);
        let mut out = f.push("ok [[r");
        out.push_str(&f.push("]]no[[/r]] fine"));
        out.push_str(&f.finish().text);
        assert_eq!(out, "ok  fine");
    }

    #[test]
    fn partial_suffix_helper() {
        assert_eq!(partial_tag_suffix("abc<", "<think>"), 1);
        assert_eq!(partial_tag_suffix("abc<think", "<think>"), 6);
        assert_eq!(partial_tag_suffix("abc", "<think>"), 0);
        assert_eq!(partial_tag_suffix("", "<think>"), 0);
        assert_eq!(partial_tag_suffix("<", "<"), 0);
    }
}
