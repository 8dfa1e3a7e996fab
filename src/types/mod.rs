// Public modules
pub mod chat_event;
pub mod chat_request;
pub mod export_document;
pub mod model_params;

// Re-exports
pub use chat_event::{ChatEvent, EventMessage};
pub use chat_request::{ChatRequest, WireMessage};
pub use export_document::{ExportDocument, ExportMetadata};
pub use model_params::ModelParams;
