// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

/// Drops the blank-line padding models like to emit before an answer.
///
/// Within the first `window` parsed frames of a response, a delta containing
/// any `\n` is dropped whole. The frame counter advances once per frame
/// whether the delta is dropped or forwarded, so the window always closes
/// after `window` frames and later paragraph breaks pass untouched.
#[derive(Debug, Clone)]
pub struct LeadingNewlineSuppressor {
    window: usize,
    frames_seen: usize,
}

impl LeadingNewlineSuppressor {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            frames_seen: 0,
        }
    }

    /// Record one frame; returns whether its delta should be forwarded.
    pub fn admit(&mut self, delta: &str) -> bool {
        let in_window = self.frames_seen < self.window;
        self.frames_seen = self.frames_seen.saturating_add(1);
        !(in_window && delta.contains('\n'))
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }
}
