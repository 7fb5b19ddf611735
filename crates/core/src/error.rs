use crate::session_state::SessionStatus;

/// Input rejected locally, before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("invalid language tag: {0:?}")]
    InvalidLanguageTag(String),
    #[error("native and target language are both '{0}'")]
    SameLanguage(String),
    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
}

/// A failed round trip to the tutor endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("tutor endpoint returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not reach tutor endpoint: {0}")]
    Transport(String),
    #[error("malformed reply from tutor endpoint: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// The HTTP status reported by the endpoint, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("speech recognition is not available on this platform")]
    Unavailable,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this platform")]
    PlaybackUnavailable,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Errors returned by [`crate::session_state::TutorSession`] operations.
///
/// None of these are fatal: the session stays in a well-defined state and the
/// caller may simply retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot {action} while the session is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },
    #[error("a tutor reply is already in flight")]
    Busy,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
