//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::types::ModelParams;

/// Default model when none is specified.
const DEFAULT_MODEL: &str = "llama2";

/// Command-line arguments for the ollamus-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: llama2)", "MODEL")]
    pub model: Option<String>,

    /// API base of the inference server.
    #[arrrg(optional, "API base (default: http://localhost:11434/api)", "URL")]
    pub api_base: Option<String>,

    /// Context window length.
    #[arrrg(optional, "Context window length in tokens", "TOKENS")]
    pub context_length: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: String,

    /// Sampling parameters sent with every request.
    pub params: ModelParams,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: llama2
    /// - Sampling: server defaults (no explicit values)
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            params: ModelParams::default(),
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling parameters.
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            params: ModelParams {
                num_ctx: args.context_length,
                ..ModelParams::default()
            },
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, "llama2");
        assert_eq!(config.params, ModelParams::default());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert_eq!(config.model, "llama2");
        assert!(config.params.temperature.is_none());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("mistral".to_string()),
            api_base: None,
            context_length: Some(2048),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.model, "mistral");
        assert_eq!(config.params.num_ctx, Some(2048));
        assert!(config.params.temperature.is_none());
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model("codellama")
            .with_params(ModelParams::default().with_temperature(0.5).with_top_k(64))
            .without_color();

        assert_eq!(config.model, "codellama");
        assert_eq!(config.params.temperature, Some(0.5));
        assert_eq!(config.params.top_k, Some(64));
        assert!(!config.use_color);
    }
}
