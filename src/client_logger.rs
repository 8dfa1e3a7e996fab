//! Logging trait for Ollama client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to
//! capture and log all traffic passing through the [`Ollama`](crate::Ollama)
//! client.

use crate::types::{ChatEvent, ChatRequest};

/// A trait for logging Ollama client operations.
///
/// Implement this trait to capture and record all API interactions: the
/// outbound request and each individual streaming event.
///
/// # Example
///
/// ```rust,ignore
/// use ollamus::{ChatEvent, ChatRequest, ClientLogger};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_event(&self, event: &ChatEvent) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Event: {}", serde_json::to_string(event).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an outbound chat request.
    ///
    /// This method is called once per `chat_stream` call, before the request
    /// is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Log an individual streaming event.
    ///
    /// This method is called for each [`ChatEvent`] successfully parsed from
    /// the response stream, including the terminal `done` event.
    fn log_stream_event(&self, event: &ChatEvent);
}
