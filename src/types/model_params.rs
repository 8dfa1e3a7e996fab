use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every chat-completion request.
///
/// Unset values are omitted from the wire so the server applies its own
/// defaults. The session rebuilds this struct from its configuration before
/// each send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-k sampling limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Top-p nucleus sampling value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Penalty applied to repeated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,

    /// Context window length, in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

impl ModelParams {
    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the top-k limit.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the repeat penalty.
    pub fn with_repeat_penalty(mut self, repeat_penalty: f32) -> Self {
        self.repeat_penalty = Some(repeat_penalty);
        self
    }

    /// Sets the context window length.
    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn default_serializes_empty() {
        let params = ModelParams::default();
        assert_eq!(to_value(&params).unwrap(), json!({}));
    }

    #[test]
    fn set_values_serialize_flat() {
        // Values chosen to be exactly representable in f32.
        let params = ModelParams::default()
            .with_temperature(0.5)
            .with_top_k(40)
            .with_top_p(0.75)
            .with_repeat_penalty(1.5)
            .with_num_ctx(2048);
        assert_eq!(
            to_value(&params).unwrap(),
            json!({
                "temperature": 0.5,
                "top_k": 40,
                "top_p": 0.75,
                "repeat_penalty": 1.5,
                "num_ctx": 2048
            })
        );
    }
}
