//! JSON bodies of `POST /api/chat`, shared by the relay client and server.

use crate::error::ValidationError;
use crate::lesson::{LanguageTag, LessonSettings, check_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub native_language: String,
    pub target_language: String,
    pub difficulty: String,
    pub message: String,
}

impl ChatRequest {
    pub fn new(settings: &LessonSettings, message: impl Into<String>) -> Self {
        Self {
            native_language: settings.native_language.to_string(),
            target_language: settings.target_language.to_string(),
            difficulty: settings.difficulty.to_string(),
            message: message.into(),
        }
    }

    /// Checks what the server can check without the upstream provider.
    /// Difficulty stays free-form text; it is only interpolated into the prompt.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let native = LanguageTag::parse(&self.native_language)?;
        let target = LanguageTag::parse(&self.target_language)?;
        check_pair(&native, &target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
