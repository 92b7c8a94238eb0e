/// Line splitter for chunked HTTP bodies.
///
/// Body chunks arrive on arbitrary byte boundaries. Lines are cut at `\n`
/// with an optional preceding `\r` removed; UTF-8 validation is left to the
/// consumer so one bad line does not poison its neighbours.
use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use memchr::memchr;

pub struct LineSplitter {
    buffer: BytesMut,
    scanned: usize,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            scanned: 0,
        }
    }

    /// Feed a raw chunk and return any complete lines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed a raw chunk and append complete lines into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<Bytes>) {
        self.buffer.extend_from_slice(chunk);
        while let Some(rel_pos) = memchr(b'\n', &self.buffer[self.scanned..]) {
            let line_end = self.scanned + rel_pos;
            let line = self.buffer.split_to(line_end + 1).freeze();
            out.push(strip_line_terminator(line));
            self.scanned = 0;
        }
        // Everything left has been searched already.
        self.scanned = self.buffer.len();
    }

    /// Take the unterminated tail, if any. Called once the body ends.
    pub fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        Some(strip_line_terminator(self.buffer.split().freeze()))
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn strip_line_terminator(line: Bytes) -> Bytes {
    let mut end = line.len();
    if line[..end].ends_with(b"\n") {
        end -= 1;
    }
    if line[..end].ends_with(b"\r") {
        end -= 1;
    }
    line.slice(..end)
}

/// Split a byte stream into lines using [`LineSplitter`].
///
/// A transport error is passed through as the final item; the stream ends
/// after it.
pub fn line_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            LineSplitter::new(),
            VecDeque::<Bytes>::with_capacity(8),
            Vec::<Bytes>::with_capacity(8),
            false,
        ),
        |(mut stream, mut splitter, mut pending, mut parsed, mut done)| async move {
            loop {
                if let Some(line) = pending.pop_front() {
                    return Some((Ok(line), (stream, splitter, pending, parsed, done)));
                }
                if done {
                    return None;
                }

                match stream.as_mut().next().await {
                    Some(Ok(chunk)) => {
                        splitter.feed_into(&chunk, &mut parsed);
                        pending.extend(parsed.drain(..));
                    }
                    Some(Err(err)) => {
                        done = true;
                        return Some((Err(err), (stream, splitter, pending, parsed, done)));
                    }
                    None => {
                        done = true;
                        if let Some(tail) = splitter.finish() {
                            pending.push_back(tail);
                        }
                    }
                }
            }
        },
    )
}
