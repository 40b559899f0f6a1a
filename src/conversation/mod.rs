//! Chat message types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message sent by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message: String,
    /// Free-form client context, currently unused by the assistant
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

/// Assistant answer with follow-up prompts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            suggestions: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = Some(suggestions.iter().map(|s| s.to_string()).collect());
        self
    }
}
