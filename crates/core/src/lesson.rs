use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A BCP 47 style language tag such as `es`, `en-US` or `zh-Hans-CN`.
///
/// Only the shape is checked: a 2-8 letter primary subtag followed by any
/// number of 1-8 character alphanumeric subtags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        let tag = tag.trim();
        let mut subtags = tag.split('-');
        let primary = subtags.next().unwrap_or_default();

        let primary_ok =
            (2..=8).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic());
        let rest_ok = subtags.all(|s| {
            (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
        });

        if primary_ok && rest_ok {
            Ok(Self(tag.to_string()))
        } else {
            Err(ValidationError::InvalidLanguageTag(tag.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language part of the tag, lowercased (`es` for `es-MX`).
    pub fn primary(&self) -> String {
        self.0
            .split('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// English name of the language, falling back to the raw tag.
    pub fn display_name(&self) -> &str {
        match self.primary().as_str() {
            "ar" => "Arabic",
            "de" => "German",
            "en" => "English",
            "es" => "Spanish",
            "fr" => "French",
            "hi" => "Hindi",
            "it" => "Italian",
            "ja" => "Japanese",
            "ko" => "Korean",
            "nl" => "Dutch",
            "pt" => "Portuguese",
            "ru" => "Russian",
            "zh" => "Chinese",
            _ => self.as_str(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ValidationError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// What the learner picked before starting: who they are and what they study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSettings {
    pub native_language: LanguageTag,
    pub target_language: LanguageTag,
    pub difficulty: Difficulty,
}

impl LessonSettings {
    pub fn new(
        native_language: &str,
        target_language: &str,
        difficulty: Difficulty,
    ) -> Result<Self, ValidationError> {
        let native_language = LanguageTag::parse(native_language)?;
        let target_language = LanguageTag::parse(target_language)?;
        check_pair(&native_language, &target_language)?;
        Ok(Self {
            native_language,
            target_language,
            difficulty,
        })
    }

    /// The opening message sent on behalf of the learner when a session starts.
    pub fn greeting_prompt(&self) -> String {
        format!(
            "Hello! I am ready to help you learn {}",
            self.target_language.display_name()
        )
    }
}

/// Learning a language you already speak natively is not a lesson.
pub fn check_pair(native: &LanguageTag, target: &LanguageTag) -> Result<(), ValidationError> {
    if native.primary() == target.primary() {
        return Err(ValidationError::SameLanguage(target.primary()));
    }
    Ok(())
}
