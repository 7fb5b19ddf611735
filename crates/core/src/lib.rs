pub mod error;
pub mod lesson;
pub mod relay;
pub mod session_state;
pub mod speech;
pub mod turn;
pub mod view;
pub mod wire;

#[cfg(test)]
mod testing;

pub use error::{CaptureError, SessionError, SpeechError, UpstreamError, ValidationError};
pub use lesson::{Difficulty, LanguageTag, LessonSettings};
pub use relay::{ChatRelay, RelayClient};
pub use session_state::{SendOutcome, SessionSnapshot, SessionStatus, TutorSession};
pub use speech::{CaptureMode, CaptureStream, Recognizer, SpeechAdapter, Synthesizer, Transcript};
pub use turn::{Speaker, Turn};
pub use view::{Control, ControlVisibility, Progress, View};
