//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the inference server.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the model. Changing the model also clears history.
    Model(String),

    /// Set the sampling temperature.
    Temperature(f32),

    /// Clear the sampling temperature (use server default).
    ClearTemperature,

    /// Set the top-p value.
    TopP(f32),

    /// Clear the top-p value.
    ClearTopP,

    /// Set the top-k value.
    TopK(u32),

    /// Clear the top-k value.
    ClearTopK,

    /// Set the repeat penalty.
    RepeatPenalty(f32),

    /// Clear the repeat penalty.
    ClearRepeatPenalty,

    /// Set the context window length.
    ContextLength(u32),

    /// Clear the context window length.
    ClearContextLength,

    /// Export the conversation document to a file.
    Export(String),

    /// Import a conversation document from a file.
    Import(String),

    /// Write the rendered transcript page to a file.
    Html(String),

    /// Display session statistics (message count, token totals, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use ollamus::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model mistral").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "temperature" => parse_float_setting(
            argument,
            "temperature",
            ChatCommand::Temperature,
            ChatCommand::ClearTemperature,
        ),
        "top-p" => parse_float_setting(argument, "top-p", ChatCommand::TopP, ChatCommand::ClearTopP),
        "top-k" => parse_int_setting(argument, "top-k", ChatCommand::TopK, ChatCommand::ClearTopK),
        "repeat-penalty" => parse_float_setting(
            argument,
            "repeat-penalty",
            ChatCommand::RepeatPenalty,
            ChatCommand::ClearRepeatPenalty,
        ),
        "context" => parse_int_setting(
            argument,
            "context",
            ChatCommand::ContextLength,
            ChatCommand::ClearContextLength,
        ),
        "export" => match argument {
            Some(path) => ChatCommand::Export(path.to_string()),
            None => ChatCommand::Invalid("/export requires a file path".to_string()),
        },
        "import" => match argument {
            Some(path) => ChatCommand::Import(path.to_string()),
            None => ChatCommand::Invalid("/import requires a file path".to_string()),
        },
        "html" => match argument {
            Some(path) => ChatCommand::Html(path.to_string()),
            None => ChatCommand::Invalid("/html requires a file path".to_string()),
        },
        "stats" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_float_setting(
    argument: Option<&str>,
    name: &str,
    set: fn(f32) -> ChatCommand,
    clear: ChatCommand,
) -> ChatCommand {
    match argument {
        Some("default") => clear,
        Some(value) => match value.parse::<f32>() {
            Ok(value) => set(value),
            Err(_) => ChatCommand::Invalid(format!("/{name}: {value:?} is not a number")),
        },
        None => ChatCommand::Invalid(format!("/{name} requires a value or \"default\"")),
    }
}

fn parse_int_setting(
    argument: Option<&str>,
    name: &str,
    set: fn(u32) -> ChatCommand,
    clear: ChatCommand,
) -> ChatCommand {
    match argument {
        Some("default") => clear,
        Some(value) => match value.parse::<u32>() {
            Ok(value) => set(value),
            Err(_) => ChatCommand::Invalid(format!("/{name}: {value:?} is not a whole number")),
        },
        None => ChatCommand::Invalid(format!("/{name} requires a value or \"default\"")),
    }
}

/// Returns the help text listing available commands.
pub fn help_text() -> &'static str {
    "Available commands:
  /clear                  Clear conversation history
  /model <name>           Change the model (clears history)
  /temperature <v>        Set sampling temperature (\"default\" to clear)
  /top-p <v>              Set top-p value (\"default\" to clear)
  /top-k <n>              Set top-k limit (\"default\" to clear)
  /repeat-penalty <v>     Set repeat penalty (\"default\" to clear)
  /context <n>            Set context window length (\"default\" to clear)
  /export <path>          Export the conversation as JSON
  /import <path>          Import a conversation from JSON
  /html <path>            Write the rendered transcript page
  /stats                  Show session statistics
  /config                 Show current configuration
  /help                   Show this help
  /quit                   Exit"
}
