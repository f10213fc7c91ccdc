// ABOUTME: Splits streamed assistant output into visible answer text and think-block reasoning
// ABOUTME: Tolerates delimiters fragmented across chunks and tracks thinking duration
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Think-Block Splitter
//!
//! Reasoning models wrap their chain of thought in `<think>...</think>`
//! delimiters inline with the answer text. The splitter consumes streamed
//! content deltas and accumulates reasoning and answer text separately, so
//! the final classification is the same regardless of how the stream was
//! chunked: a delimiter split across two deltas is held back until enough
//! bytes arrive to decide.
//!
//! Some models omit the opening tag and emit only a closing `</think>`. In
//! that case everything seen before the close is reclassified as reasoning.

use std::time::Instant;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Longest delimiter prefix that must be held back at a chunk boundary
const MAX_HOLDBACK: usize = CLOSE_TAG.len() - 1;

/// Incremental splitter for `<think>` blocks in streamed assistant output
#[derive(Debug)]
pub struct ThinkSplitter {
    answer: String,
    thinking: String,
    /// Trailing bytes not yet classified (possible partial delimiter)
    pending: String,
    in_think_block: bool,
    stream_started_at: Instant,
    block_opened_at: Option<Instant>,
    thinking_ms: Option<u64>,
}

impl Default for ThinkSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkSplitter {
    /// Create a splitter; the stream clock starts now
    #[must_use]
    pub fn new() -> Self {
        Self {
            answer: String::new(),
            thinking: String::new(),
            pending: String::new(),
            in_think_block: false,
            stream_started_at: Instant::now(),
            block_opened_at: None,
            thinking_ms: None,
        }
    }

    /// Feed one streamed content delta
    pub fn push(&mut self, delta: &str) {
        self.pending.push_str(delta);
        self.drain_pending();
    }

    /// Flush held-back bytes and close any open think block
    ///
    /// Called when the stream ends. An unterminated `<think>` block keeps its
    /// accumulated text as reasoning and the duration runs to now.
    pub fn finish(&mut self) {
        self.drain_pending();
        // Whatever is still held back can no longer become a delimiter
        let tail = std::mem::take(&mut self.pending);
        self.active_buffer().push_str(&tail);

        if self.in_think_block {
            self.close_block(self.block_opened_at.unwrap_or(self.stream_started_at));
            self.in_think_block = false;
        }
    }

    /// Reasoning text accumulated so far
    #[must_use]
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    /// Answer text accumulated so far
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Whether the splitter is currently inside a think block
    #[must_use]
    pub const fn is_thinking(&self) -> bool {
        self.in_think_block
    }

    /// Total milliseconds spent inside think blocks, if any reasoning was seen
    #[must_use]
    pub const fn thinking_duration_ms(&self) -> Option<u64> {
        self.thinking_ms
    }

    fn drain_pending(&mut self) {
        loop {
            let open = self.pending.find(OPEN_TAG);
            let close = self.pending.find(CLOSE_TAG);

            let (pos, is_open) = match (open, close) {
                (Some(o), Some(c)) if o < c => (o, true),
                (Some(o), None) => (o, true),
                (_, Some(c)) => (c, false),
                (None, None) => break,
            };

            let before = self.pending[..pos].to_owned();
            self.active_buffer().push_str(&before);
            let tag_len = if is_open { OPEN_TAG.len() } else { CLOSE_TAG.len() };
            self.pending = self.pending[pos + tag_len..].to_owned();

            if is_open {
                if self.in_think_block {
                    // Nested open tag inside a think block is literal text
                    self.thinking.push_str(OPEN_TAG);
                } else {
                    self.in_think_block = true;
                    self.block_opened_at = Some(Instant::now());
                }
            } else if self.in_think_block {
                self.close_block(self.block_opened_at.unwrap_or(self.stream_started_at));
                self.in_think_block = false;
            } else {
                // Close without open: everything so far was reasoning
                let reclassified = std::mem::take(&mut self.answer);
                self.thinking.push_str(&reclassified);
                self.close_block(self.stream_started_at);
            }
        }

        self.hold_back_partial_delimiter();
    }

    /// Move classified bytes out of `pending`, keeping only a trailing
    /// fragment that could still complete a delimiter on the next push
    fn hold_back_partial_delimiter(&mut self) {
        let bytes = self.pending.as_bytes();
        let max = bytes.len().min(MAX_HOLDBACK);

        let mut hold = 0;
        for k in (1..=max).rev() {
            let tail = &bytes[bytes.len() - k..];
            if OPEN_TAG.as_bytes().starts_with(tail) || CLOSE_TAG.as_bytes().starts_with(tail) {
                hold = k;
                break;
            }
        }

        // Delimiter prefixes are ASCII, so this split lands on a char boundary
        let classified = self.pending[..self.pending.len() - hold].to_owned();
        self.active_buffer().push_str(&classified);
        self.pending = self.pending[self.pending.len() - hold..].to_owned();
    }

    fn close_block(&mut self, opened_at: Instant) {
        let elapsed = u64::try_from(opened_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.thinking_ms = Some(self.thinking_ms.unwrap_or(0).saturating_add(elapsed));
    }

    fn active_buffer(&mut self) -> &mut String {
        if self.in_think_block {
            &mut self.thinking
        } else {
            &mut self.answer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(chunks: &[&str]) -> ThinkSplitter {
        let mut splitter = ThinkSplitter::new();
        for chunk in chunks {
            splitter.push(chunk);
        }
        splitter.finish();
        splitter
    }

    #[test]
    fn test_no_think_block() {
        let s = split(&["Hello ", "world"]);
        assert_eq!(s.answer(), "Hello world");
        assert_eq!(s.thinking(), "");
        assert_eq!(s.thinking_duration_ms(), None);
    }

    #[test]
    fn test_single_think_block() {
        let s = split(&["<think>pondering</think>The answer is 4."]);
        assert_eq!(s.thinking(), "pondering");
        assert_eq!(s.answer(), "The answer is 4.");
        assert!(s.thinking_duration_ms().is_some());
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let s = split(&["<thi", "nk>abc</th", "ink>def"]);
        assert_eq!(s.thinking(), "abc");
        assert_eq!(s.answer(), "def");
    }

    #[test]
    fn test_chunking_invariance() {
        let text = "<think>let me reason</think>final answer";
        let whole = split(&[text]);
        let byte_at_a_time: Vec<String> =
            text.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = byte_at_a_time.iter().map(String::as_str).collect();
        let pieced = split(&refs);

        assert_eq!(whole.thinking(), pieced.thinking());
        assert_eq!(whole.answer(), pieced.answer());
    }

    #[test]
    fn test_close_without_open_reclassifies() {
        let s = split(&["I was reasoning all along</think>visible answer"]);
        assert_eq!(s.thinking(), "I was reasoning all along");
        assert_eq!(s.answer(), "visible answer");
        assert!(s.thinking_duration_ms().is_some());
    }

    #[test]
    fn test_unterminated_think_block() {
        let s = split(&["<think>never finished"]);
        assert_eq!(s.thinking(), "never finished");
        assert_eq!(s.answer(), "");
        assert!(s.thinking_duration_ms().is_some());
    }

    #[test]
    fn test_literal_angle_bracket_not_swallowed() {
        let s = split(&["a < b and a <t", "est> tag"]);
        assert_eq!(s.answer(), "a < b and a <test> tag");
        assert_eq!(s.thinking(), "");
    }

    #[test]
    fn test_multiple_think_blocks_accumulate() {
        let s = split(&["<think>one</think>first<think>two</think>second"]);
        assert_eq!(s.thinking(), "onetwo");
        assert_eq!(s.answer(), "firstsecond");
    }

    #[test]
    fn test_nested_open_tag_is_literal() {
        let s = split(&["<think>outer<think>inner</think>answer"]);
        assert_eq!(s.thinking(), "outer<think>inner");
        assert_eq!(s.answer(), "answer");
    }

    #[test]
    fn test_trailing_partial_delimiter_flushed_on_finish() {
        let s = split(&["answer text</thi"]);
        assert_eq!(s.answer(), "answer text</thi");
        assert_eq!(s.thinking(), "");
    }
}
