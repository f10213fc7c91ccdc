// ABOUTME: Line-buffering parser for Ollama's newline-delimited JSON streaming responses
// ABOUTME: Handles partial lines across TCP boundaries and multiple chunks per read
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # NDJSON Stream Parser
//!
//! Ollama streams completions as newline-delimited JSON objects. TCP does not
//! guarantee alignment between network reads and line boundaries, so this
//! parser buffers incomplete lines and emits complete JSON documents only when
//! a full line is available. It also handles the opposite case where a single
//! network read batches several lines.
//!
//! Buffering happens on raw bytes: a read boundary can land in the middle of
//! a multibyte UTF-8 character, so decoding is deferred until a complete line
//! (delimited by the ASCII newline) has been assembled.
//!
//! Malformed lines are logged and skipped rather than killing the stream;
//! transport errors terminate it with a single error item.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};
use tracing::warn;

use super::{CompletionChunk, CompletionStream};
use crate::errors::AppError;

/// Line buffer that handles partial NDJSON lines across TCP chunk boundaries
///
/// Holds raw bytes, not text: decoding a read in isolation would mangle any
/// multibyte character that straddles a read boundary.
#[derive(Debug, Default)]
pub struct NdjsonLineBuffer {
    /// Accumulated bytes not yet terminated by a newline
    buffer: Vec<u8>,
}

impl NdjsonLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed raw bytes from a TCP read, returning any complete lines
    ///
    /// Bytes are appended to the internal buffer. Complete lines (terminated
    /// by `\n`) are decoded and returned with empty lines dropped. Any
    /// trailing partial line remains buffered, as bytes, for the next
    /// `feed()` call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let text = String::from_utf8_lossy(&line);
            if !text.trim().is_empty() {
                lines.push(text.into_owned());
            }
        }
        lines
    }

    /// Flush any remaining buffered content as a final line
    ///
    /// Called when the byte stream ends without a trailing newline.
    pub fn flush(&mut self) -> Option<String> {
        let remaining = mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&remaining);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }
}

/// Internal state for the chunk stream unfold
struct ChunkStreamState {
    parser: NdjsonLineBuffer,
    pending: VecDeque<Result<CompletionChunk, AppError>>,
    stream_ended: bool,
}

fn parse_line(line: &str, pending: &mut VecDeque<Result<CompletionChunk, AppError>>) {
    match serde_json::from_str::<CompletionChunk>(line) {
        Ok(chunk) => pending.push_back(Ok(chunk)),
        Err(e) => {
            warn!(error = %e, "Skipping malformed NDJSON line from Ollama");
        }
    }
}

/// Create a properly-buffered completion chunk stream from a raw byte stream
///
/// Wraps a `reqwest` byte stream with NDJSON line buffering. Each complete
/// line is parsed as a [`CompletionChunk`]; lines that fail to parse are
/// logged and skipped. A transport error ends the stream with one terminal
/// `Err` item.
pub fn create_chunk_stream<S>(byte_stream: S) -> CompletionStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let state = ChunkStreamState {
        parser: NdjsonLineBuffer::new(),
        pending: VecDeque::new(),
        stream_ended: false,
    };

    // Use unfold to maintain parser state across async iterations.
    // Each iteration either drains a pending chunk or reads the next TCP chunk.
    let stream = unfold(
        (
            Box::pin(byte_stream)
                as Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
            state,
        ),
        |(mut byte_stream, mut state)| async move {
            loop {
                // Drain pending chunks first (multiple lines per TCP read)
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, (byte_stream, state)));
                }

                if state.stream_ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        for line in state.parser.feed(&bytes) {
                            parse_line(&line, &mut state.pending);
                        }
                        // Loop to drain pending chunks
                    }
                    Some(Err(e)) => {
                        state.stream_ended = true;
                        return Some((
                            Err(AppError::external_service(
                                "Ollama",
                                format!("Stream read error: {e}"),
                            )),
                            (byte_stream, state),
                        ));
                    }
                    None => {
                        state.stream_ended = true;
                        if let Some(line) = state.parser.flush() {
                            parse_line(&line, &mut state.pending);
                        }
                        if let Some(item) = state.pending.pop_front() {
                            return Some((item, (byte_stream, state)));
                        }
                        return None;
                    }
                }
            }
        },
    );

    Box::pin(stream)
}
