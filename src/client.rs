use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::ndjson::process_ndjson;
use crate::observability;
use crate::types::{ChatEvent, ChatRequest};

const DEFAULT_API_BASE: &str = "http://localhost:11434/api";

/// Client for a local Ollama inference server.
///
/// No request timeout is configured: a streaming generation legitimately
/// takes as long as it takes, and an unresponsive server stalls the turn
/// rather than failing it.
#[derive(Clone)]
pub struct Ollama {
    client: ReqwestClient,
    base_url: String,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Ollama {
    /// Create a new Ollama client.
    ///
    /// The API base can be provided directly or read from the
    /// OLLAMUS_BASE_URL environment variable, falling back to the standard
    /// local endpoint `http://localhost:11434/api`.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let base_url = match base_url {
            Some(base) => base,
            None => env::var("OLLAMUS_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        };

        // Reject an unusable base before the first request does.
        Url::parse(&base_url)
            .map_err(|e| Error::url(format!("Invalid API base {base_url:?}: {e}"), Some(e)))?;

        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            logger: None,
        })
    }

    /// Attach a logger that observes every request and stream event.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns the API base this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/x-ndjson"),
        );
        headers
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        // Ollama reports failures as a JSON body with a single "error" field.
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| error_body.clone());

        // Map HTTP status code to appropriate error type
        match status_code {
            400 => Error::bad_request(message, None),
            404 => Error::not_found(message, None),
            408 => Error::timeout(message),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message),
            _ => Error::api(status_code, message),
        }
    }

    /// Issue a streaming chat-completion request.
    ///
    /// Returns a stream of [`ChatEvent`] objects that can be processed
    /// incrementally. Connection failures and non-2xx statuses fail the call
    /// immediately; the stream itself is lazy and reads from the socket only
    /// as it is pulled.
    pub async fn chat_stream(
        &self,
        mut request: ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>>> {
        request.stream = true;

        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        let url = format!("{}/chat", self.base_url);

        observability::CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                observability::CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(format!("Request timed out: {}", e))
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            observability::CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        // Get the byte stream from the response
        let stream = response.bytes_stream();

        // Create an NDJSON processor
        let event_stream = process_ndjson(stream);

        match self.logger.clone() {
            Some(logger) => Ok(Box::pin(event_stream.inspect(move |item| {
                if let Ok(event) = item {
                    logger.log_stream_event(event);
                }
            }))),
            None => Ok(Box::pin(event_stream)),
        }
    }
}

impl fmt::Debug for Ollama {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ollama")
            .field("base_url", &self.base_url)
            .finish()
    }
}
