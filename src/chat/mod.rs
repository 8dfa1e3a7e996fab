//! Chat application module for interactive conversations with a local
//! model.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! ollamus client library. It supports:
//!
//! - Streaming responses with real-time fragment display
//! - Slash commands for session control
//! - Conversation export/import and rendered transcript pages
//! - Configurable model and sampling parameters
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - `config`: CLI argument parsing and configuration
//! - `session`: Core chat session management and turn driving
//! - `commands`: Slash command parsing and handling
//! - `output`: Terminal output during streaming

mod commands;
mod config;
mod output;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use output::{AnsiOutput, ChatOutput};
pub use session::{ChatSession, SessionStats};
