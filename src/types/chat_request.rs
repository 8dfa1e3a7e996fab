use serde::Serialize;

use crate::transcript::{Message, Role, Transcript};
use crate::types::ModelParams;

/// A single `{role, content}` entry in the request body.
///
/// Timestamps are a session-local concern and never go over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    /// The role of the message.
    pub role: Role,

    /// The text content of the message.
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of a chat-completion request.
///
/// Sampling parameters are flattened to the top level of the JSON object,
/// next to `model` and `stream`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// The model to generate with.
    pub model: String,

    /// The full conversation so far, role and content only.
    pub messages: Vec<WireMessage>,

    /// Whether the server should stream the response.
    pub stream: bool,

    /// Sampling parameters for this request.
    #[serde(flatten)]
    pub params: ModelParams,
}

impl ChatRequest {
    /// Builds a streaming request carrying the entire transcript.
    pub fn from_transcript(
        model: impl Into<String>,
        transcript: &Transcript,
        params: ModelParams,
    ) -> Self {
        Self {
            model: model.into(),
            messages: transcript.iter().map(WireMessage::from).collect(),
            stream: true,
            params,
        }
    }
}
