use futures::{Stream, StreamExt};
use tracing::debug;

use super::buffering::CircularLineBuffer;
use crate::error::ReplyError;
use crate::streaming::StreamEvent;
use crate::traits::EventStream;

/// Decode one NDJSON record
///
/// Blank lines and records that are not a known event yield `None`. A
/// leading `data:` prefix is tolerated for backends that frame NDJSON as SSE.
pub fn parse_event_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    let line = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, record = %truncate(line, 120), "skipping unparsable stream record");
            None
        }
    }
}

/// Turn a byte stream into a stream of [`StreamEvent`]s
///
/// Records split across chunks are reassembled. A transport error is yielded
/// once and ends the stream.
pub fn parse_ndjson_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ReplyError> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(8192);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    buffer.extend(chunk.as_ref());
                    while let Some(line) = buffer.next_line() {
                        if let Some(event) = parse_event_line(&line) {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        if let Some(tail) = buffer.finish() {
            if let Some(event) = parse_event_line(&tail) {
                yield Ok(event);
            }
        }
    })
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
