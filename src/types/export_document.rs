use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::Result;
use crate::transcript::{Message, Transcript};

/// Document metadata: which model produced the conversation, and when the
/// document was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// The model identifier active when the document was exported.
    pub model: String,

    /// When the document was exported.
    #[serde(with = "crate::utils::time")]
    pub export_time: OffsetDateTime,
}

/// A portable conversation document.
///
/// Importing an exported document reproduces an equivalent transcript and
/// model identifier; `export_time` is stamped fresh on each export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Model identity and export timestamp.
    pub metadata: ExportMetadata,

    /// The messages, in conversation order.
    pub messages: Vec<Message>,
}

impl ExportDocument {
    /// Captures the transcript and model identity into a document.
    pub fn new(model: impl Into<String>, transcript: &Transcript) -> Self {
        Self {
            metadata: ExportMetadata {
                model: model.into(),
                export_time: OffsetDateTime::now_utc(),
            },
            messages: transcript.snapshot().to_vec(),
        }
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            crate::error::Error::serialization(
                "failed to serialize export document",
                Some(Box::new(err)),
            )
        })
    }

    /// Parses a document from raw JSON.
    ///
    /// Any shape deviation — bad JSON, missing fields, invalid timestamp
    /// encoding — is an error; the caller applies nothing on failure.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| {
            crate::error::Error::serialization(
                "failed to parse export document",
                Some(Box::new(err)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    fn sample_transcript() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, "What is Rust?");
        transcript.append(Role::Assistant, "A systems programming language.");
        transcript
    }

    #[test]
    fn document_roundtrips() {
        let transcript = sample_transcript();
        let document = ExportDocument::new("llama2", &transcript);

        let json = document.to_json().unwrap();
        let back = ExportDocument::from_json(&json).unwrap();

        assert_eq!(back.metadata.model, "llama2");
        assert_eq!(back.messages, transcript.snapshot());
    }

    #[test]
    fn not_json_is_rejected() {
        assert!(ExportDocument::from_json("not json").is_err());
    }

    #[test]
    fn missing_metadata_is_rejected() {
        let raw = r#"{"messages": []}"#;
        assert!(ExportDocument::from_json(raw).is_err());
    }

    #[test]
    fn missing_model_is_rejected() {
        let raw = r#"{"metadata": {"export_time": "2024-05-01T10:00:00Z"}, "messages": []}"#;
        assert!(ExportDocument::from_json(raw).is_err());
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let raw = r#"{
            "metadata": {"model": "llama2", "export_time": "yesterday"},
            "messages": [{"role": "user", "content": "hi", "timestamp": "2024-05-01T10:00:00Z"}]
        }"#;
        assert!(ExportDocument::from_json(raw).is_err());
    }

    #[test]
    fn wellformed_document_parses() {
        let raw = r#"{
            "metadata": {"model": "mistral", "export_time": "2024-05-01T10:00:00Z"},
            "messages": [
                {"role": "user", "content": "hi", "timestamp": "2024-05-01T09:59:00Z"},
                {"role": "assistant", "content": "hello", "timestamp": "2024-05-01T09:59:05Z"}
            ]
        }"#;
        let document = ExportDocument::from_json(raw).unwrap();
        assert_eq!(document.metadata.model, "mistral");
        assert_eq!(document.messages.len(), 2);
        assert_eq!(document.messages[1].role, Role::Assistant);
    }
}
