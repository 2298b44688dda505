use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

/// Chat endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key. The key itself is never stored.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Longest question the player may ask, in characters
    pub input_char_limit: usize,
    /// Persona handed to the model
    pub instructions: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/responses".to_string(),
            model: "gpt-5-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            input_char_limit: 120,
            instructions: "You are a monk of the Monastery of Irache, but you speak in a \
                           warm, colloquial way. You use simple, natural, modern expressions. \
                           You keep a kind and calm tone, without archaic or overly formal \
                           language. If asked in Basque, you answer in Basque."
                .to_string(),
        }
    }
}

impl ChatSettings {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, IntegrationError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(IntegrationError::MissingApiKey(self.api_key_env.clone())),
        }
    }
}
