//! Newline-delimited JSON processing for streaming responses.
//!
//! This module handles parsing of the NDJSON stream produced by an Ollama
//! chat endpoint, converting raw byte chunks into structured [`ChatEvent`]
//! values. A line that fails to parse is surfaced as an error, never skipped:
//! silently dropping a line would silently truncate the response.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability;
use crate::types::ChatEvent;

/// Process a stream of bytes into a stream of chat events.
///
/// Chunk boundaries carry no meaning: a single chunk may hold several lines
/// and one line may span several chunks, so incoming bytes are buffered and
/// split on newlines. Blank lines are skipped.
pub fn process_ndjson<S>(byte_stream: S) -> impl Stream<Item = Result<ChatEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Use a state machine to process the line stream
    let buffer = String::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First check if we have a complete line in the buffer
                if let Some((event, remaining)) = extract_line(&buffer) {
                    buffer = remaining;
                    observe(&event);
                    return Some((event, (stream, buffer)));
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => buffer.push_str(&text),
                        Err(e) => {
                            observability::STREAM_ERRORS.click();
                            return Some((
                                Err(Error::encoding(
                                    format!("Invalid UTF-8 in stream: {e}"),
                                    Some(Box::new(e)),
                                )),
                                (stream, buffer),
                            ));
                        }
                    },
                    Some(Err(e)) => {
                        observability::STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream; a trailing line may lack its newline
                        let trailing = buffer.trim();
                        if !trailing.is_empty() {
                            let event = parse_line(trailing);
                            observe(&event);
                            return Some((event, (stream, String::new())));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract the next complete line from the buffer, skipping blank lines.
///
/// Returns the parsed event and the remaining buffer contents, or `None`
/// when no complete line is buffered yet.
fn extract_line(buffer: &str) -> Option<(Result<ChatEvent>, String)> {
    let mut rest = buffer;
    loop {
        let (line, remainder) = rest.split_once('\n')?;
        let line = line.trim();
        if line.is_empty() {
            rest = remainder;
            continue;
        }
        return Some((parse_line(line), remainder.to_string()));
    }
}

/// Parse one NDJSON line into a chat event.
fn parse_line(line: &str) -> Result<ChatEvent> {
    serde_json::from_str::<ChatEvent>(line).map_err(|e| {
        Error::serialization(
            format!("Failed to parse stream event: {e}"),
            Some(Box::new(e)),
        )
    })
}

fn observe(event: &Result<ChatEvent>) {
    match event {
        Ok(_) => observability::STREAM_EVENTS.click(),
        Err(_) => observability::STREAM_ERRORS.click(),
    }
}
