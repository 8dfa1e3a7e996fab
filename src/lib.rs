// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod ndjson;
pub mod observability;
pub mod render;
pub mod transcript;
pub mod turn;
pub mod types;
pub mod utils;

// Re-exports
pub use client::Ollama;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use render::MarkdownRenderer;
pub use transcript::{Message, Role, Transcript};
pub use turn::{TurnStream, TurnUsage, UsageTotals};
pub use types::*;
