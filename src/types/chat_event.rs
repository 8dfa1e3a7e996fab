use serde::{Deserialize, Serialize};

use crate::transcript::Role;

/// The message fragment carried by one streamed event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Role of the message being generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// The text delta for this event.
    #[serde(default)]
    pub content: String,
}

/// One newline-delimited JSON event from a streaming chat response.
///
/// Content events carry `message.content`; the terminal event has
/// `done: true`, no further content, and the server's completion counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// The message fragment, absent on the terminal event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<EventMessage>,

    /// True on the terminal event of a response.
    #[serde(default)]
    pub done: bool,

    /// Tokens evaluated from the prompt; terminal event only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    /// Tokens generated for the response; terminal event only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    /// Wall-clock duration of the whole response, in nanoseconds;
    /// terminal event only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
}

impl ChatEvent {
    /// Returns the text delta carried by this event, or `""` if absent.
    pub fn content(&self) -> &str {
        self.message.as_ref().map(|m| m.content.as_str()).unwrap_or("")
    }

    /// Builds a content event. Useful for tests and fixtures.
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            message: Some(EventMessage {
                role: Some(Role::Assistant),
                content: content.into(),
            }),
            ..Self::default()
        }
    }

    /// Builds a terminal event. Useful for tests and fixtures.
    pub fn finished() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_event_deserializes() {
        let line = r#"{"model":"llama2","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let event: ChatEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.content(), "Hel");
        assert!(!event.done);
    }

    #[test]
    fn terminal_event_carries_counters() {
        let line = r#"{"model":"llama2","done":true,"prompt_eval_count":12,"eval_count":48,"total_duration":1912345678}"#;
        let event: ChatEvent = serde_json::from_str(line).unwrap();
        assert!(event.done);
        assert_eq!(event.content(), "");
        assert_eq!(event.prompt_eval_count, Some(12));
        assert_eq!(event.eval_count, Some(48));
        assert_eq!(event.total_duration, Some(1_912_345_678));
    }

    #[test]
    fn missing_message_means_empty_content() {
        let event: ChatEvent = serde_json::from_str(r#"{"done":false}"#).unwrap();
        assert_eq!(event.content(), "");
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(serde_json::from_str::<ChatEvent>("{not json").is_err());
        assert!(serde_json::from_str::<ChatEvent>(r#"{"message": 7}"#).is_err());
    }
}
