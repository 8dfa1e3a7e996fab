//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct which owns the
//! conversation state and drives streaming turns against the inference
//! server, one turn at a time.

use crate::chat::config::ChatConfig;
use crate::client::Ollama;
use crate::error::Result;
use crate::observability;
use crate::render::MarkdownRenderer;
use crate::transcript::{Role, Transcript};
use crate::turn::{TurnStream, UsageTotals};
use crate::types::{ChatRequest, ExportDocument, ModelParams};

/// A chat session owning the transcript, configuration, and renderer.
///
/// The session drives one turn at a time: `send_turn` takes `&mut self` and
/// the returned [`TurnStream`] holds that borrow, so a second turn cannot
/// start until the first is drained or dropped.
pub struct ChatSession {
    client: Ollama,
    config: ChatConfig,
    transcript: Transcript,
    renderer: MarkdownRenderer,
    totals: UsageTotals,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// The sampling parameters sent with each request.
    pub params: ModelParams,
    /// Usage totals across completed turns.
    pub totals: UsageTotals,
}

impl ChatSession {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: Ollama, config: ChatConfig) -> Self {
        Self {
            client,
            config,
            transcript: Transcript::new(),
            renderer: MarkdownRenderer::new(),
            totals: UsageTotals::default(),
        }
    }

    /// Sends a user message and returns the turn's fragment sequence.
    ///
    /// The user message is appended to the transcript before any network
    /// I/O, so a failed request still leaves the user's own words in
    /// history. The assistant message is appended by the returned stream
    /// only once the turn completes; see [`TurnStream`] for the
    /// cancellation and failure contract.
    pub async fn send_turn(&mut self, prompt: &str) -> TurnStream<'_> {
        self.transcript.append(Role::User, prompt);

        let request =
            ChatRequest::from_transcript(&self.config.model, &self.transcript, self.config.params);

        let Self {
            client,
            transcript,
            totals,
            ..
        } = self;
        match client.chat_stream(request).await {
            Ok(events) => TurnStream::new(events, transcript, totals),
            Err(error) => TurnStream::failed(error, transcript, totals),
        }
    }

    /// Renders text as rich HTML. Stateless; safe to call per fragment.
    pub fn render(&self, text: &str) -> String {
        self.renderer.render(text)
    }

    /// Renders the whole transcript as a standalone HTML page.
    pub fn render_page(&self) -> String {
        self.renderer.render_page(&self.transcript)
    }

    /// Serializes the transcript and model identity as a portable JSON
    /// document.
    pub fn export_document(&self) -> Result<String> {
        ExportDocument::new(&self.config.model, &self.transcript).to_json()
    }

    /// Replaces the transcript and model identity from a JSON document.
    ///
    /// The document is parsed in full before anything is applied: a
    /// malformed document is rejected and existing state is left untouched.
    pub fn import_document(&mut self, raw: &str) -> Result<()> {
        let document = match ExportDocument::from_json(raw) {
            Ok(document) => document,
            Err(error) => {
                observability::IMPORT_FAILURES.click();
                return Err(error);
            }
        };
        self.transcript.replace(document.messages);
        self.config.model = document.metadata.model;
        Ok(())
    }

    /// Clears the conversation history.
    pub fn reset(&mut self) {
        self.transcript.reset();
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the current model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Changes the model used for responses.
    ///
    /// An actual model change clears the history: the old conversation was
    /// generated under a different model and would be misleading context.
    pub fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        if model != self.config.model {
            self.config.model = model;
            self.transcript.reset();
        }
    }

    /// Sets or clears the sampling temperature.
    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.config.params.temperature = temperature;
    }

    /// Sets or clears the top-p value.
    pub fn set_top_p(&mut self, top_p: Option<f32>) {
        self.config.params.top_p = top_p;
    }

    /// Sets or clears the top-k value.
    pub fn set_top_k(&mut self, top_k: Option<u32>) {
        self.config.params.top_k = top_k;
    }

    /// Sets or clears the repeat penalty.
    pub fn set_repeat_penalty(&mut self, repeat_penalty: Option<f32>) {
        self.config.params.repeat_penalty = repeat_penalty;
    }

    /// Sets or clears the context window length.
    pub fn set_context_length(&mut self, num_ctx: Option<u32>) {
        self.config.params.num_ctx = num_ctx;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.transcript.len(),
            params: self.config.params,
            totals: self.totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::client_logger::ClientLogger;
    use crate::types::ChatEvent;

    fn session_at(base: &str) -> ChatSession {
        let client = Ollama::new(Some(base.to_string())).unwrap();
        ChatSession::new(client, ChatConfig::default())
    }

    /// Serves exactly one canned HTTP response on an ephemeral port and
    /// returns the API base to reach it.
    async fn serve_once(response: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/api")
    }

    /// Reads one HTTP request: headers, then content-length's worth of body.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        let mut remaining = content_length.saturating_sub(buf.len() - header_end);
        while remaining > 0 {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            remaining = remaining.saturating_sub(n);
        }
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    struct CollectingLogger {
        requests: Mutex<Vec<String>>,
        events: Mutex<Vec<ChatEvent>>,
    }

    impl CollectingLogger {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl ClientLogger for CollectingLogger {
        fn log_request(&self, request: &ChatRequest) {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_string(request).unwrap());
        }

        fn log_stream_event(&self, event: &ChatEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn new_session_empty() {
        let session = session_at("http://127.0.0.1:11434/api");
        assert!(session.transcript().is_empty());
        assert_eq!(session.model(), "llama2");
    }

    #[test]
    fn reset_clears_history() {
        let mut session = session_at("http://127.0.0.1:11434/api");
        session.transcript.append(Role::User, "hello");
        assert_eq!(session.transcript().len(), 1);

        session.reset();
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn model_change_clears_history() {
        let mut session = session_at("http://127.0.0.1:11434/api");
        session.transcript.append(Role::User, "hello");

        // Re-selecting the same model keeps history.
        session.set_model("llama2");
        assert_eq!(session.transcript().len(), 1);

        session.set_model("mistral");
        assert_eq!(session.model(), "mistral");
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn export_import_roundtrip() {
        let mut session = session_at("http://127.0.0.1:11434/api");
        session.set_model("mistral");
        session.transcript.append(Role::User, "What is Rust?");
        session
            .transcript
            .append(Role::Assistant, "A systems language.");

        let exported = session.export_document().unwrap();

        let mut other = session_at("http://127.0.0.1:11434/api");
        other.import_document(&exported).unwrap();

        assert_eq!(other.model(), "mistral");
        assert_eq!(other.transcript().snapshot(), session.transcript().snapshot());
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let mut session = session_at("http://127.0.0.1:11434/api");
        session.transcript.append(Role::User, "keep me");
        let before = session.transcript().snapshot().to_vec();

        assert!(session.import_document("not json").is_err());
        assert!(session.import_document(r#"{"messages": []}"#).is_err());

        assert_eq!(session.transcript().snapshot(), before);
        assert_eq!(session.model(), "llama2");
    }

    #[tokio::test]
    async fn turn_streams_fragments_and_commits() {
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\" world\"},\"done\":false}\n",
            "{\"done\":true,\"prompt_eval_count\":5,\"eval_count\":3,\"total_duration\":1000}\n",
        );
        let base = serve_once(http_response("200 OK", body)).await;

        let logger = Arc::new(CollectingLogger::new());
        let client = Ollama::new(Some(base)).unwrap().with_logger(logger.clone());
        let mut session = ChatSession::new(client, ChatConfig::default());

        let mut fragments = Vec::new();
        {
            let mut turn = session.send_turn("Say hello").await;
            while let Some(item) = turn.next().await {
                fragments.push(item.unwrap());
            }
        }

        assert_eq!(fragments, vec!["Hel", "lo", " world"]);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript().snapshot()[1].content, "Hello world");
        assert_eq!(session.stats().totals.eval_count, 3);

        // The logger observed the request and all four events.
        assert_eq!(logger.requests.lock().unwrap().len(), 1);
        assert_eq!(logger.events.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn server_error_yields_single_error_fragment() {
        let body = "{\"error\":\"something exploded\"}";
        let base = serve_once(http_response("500 Internal Server Error", body)).await;
        let mut session = session_at(&base);

        let mut items = Vec::new();
        {
            let mut turn = session.send_turn("Say hello").await;
            while let Some(item) = turn.next().await {
                items.push(item);
            }
        }

        assert_eq!(items.len(), 1);
        let error = items.pop().unwrap().unwrap_err();
        assert!(error.is_server_error());
        // Only the user message was recorded.
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().snapshot()[0].role, Role::User);
    }

    #[tokio::test]
    async fn connection_refused_yields_single_error_fragment() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut session = session_at(&format!("http://127.0.0.1:{port}/api"));

        let mut items = Vec::new();
        {
            let mut turn = session.send_turn("anyone there?").await;
            while let Some(item) = turn.next().await {
                items.push(item);
            }
        }

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn malformed_stream_line_fails_the_turn() {
        let body = concat!(
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
            "garbage that is not json\n",
            "{\"message\":{\"content\":\"lo\"},\"done\":false}\n",
        );
        let base = serve_once(http_response("200 OK", body)).await;
        let mut session = session_at(&base);

        let mut items = Vec::new();
        {
            let mut turn = session.send_turn("Say hello").await;
            while let Some(item) = turn.next().await {
                items.push(item);
            }
        }

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        // The turn failed: no assistant message was committed.
        assert_eq!(session.transcript().len(), 1);
    }
}
