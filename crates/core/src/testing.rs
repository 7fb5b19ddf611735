//! Hand-written fakes shared by the unit tests.

use crate::error::{CaptureError, UpstreamError};
use crate::lesson::LanguageTag;
use crate::relay::ChatRelay;
use crate::speech::{RecognitionEvent, Recognizer, Synthesizer, Utterance};
use crate::turn::{Speaker, Turn};
use crate::view::{ControlVisibility, Progress, View};
use crate::wire::ChatRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Semaphore, mpsc};

#[derive(Default)]
pub struct FakeSynthesizer {
    spoken: Mutex<Vec<Utterance>>,
    cancels: AtomicUsize,
    speaking: AtomicBool,
}

impl FakeSynthesizer {
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn last_utterance(&self) -> Option<Utterance> {
        self.spoken.lock().unwrap().last().cloned()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

impl Synthesizer for FakeSynthesizer {
    fn speak(&self, utterance: Utterance) {
        self.speaking.store(true, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(utterance);
    }

    fn cancel(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out pre-queued recognition sessions in order.
#[derive(Default)]
pub struct ScriptedRecognizer {
    sessions: Mutex<VecDeque<Result<mpsc::UnboundedReceiver<RecognitionEvent>, CaptureError>>>,
    opened: AtomicUsize,
}

impl ScriptedRecognizer {
    /// Queues a session and returns the sender that drives it.
    pub fn push_session(&self) -> mpsc::UnboundedSender<RecognitionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push_back(Ok(rx));
        tx
    }

    pub fn push_failure(&self, error: CaptureError) {
        self.sessions.lock().unwrap().push_back(Err(error));
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Recognizer for ScriptedRecognizer {
    fn open(
        &self,
        _language: &LanguageTag,
        _continuous: bool,
    ) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>, CaptureError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CaptureError::Recognition("no scripted session".into())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Controls(ControlVisibility),
    Cleared,
    Turn(Speaker, String),
    Typing(bool),
    Notice(String),
    Partial(String),
    PartialCleared,
    Progress(Progress),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_controls(&self) -> Option<ControlVisibility> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Controls(c) => Some(c),
            _ => None,
        })
    }

    pub fn last_progress(&self) -> Option<Progress> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Progress(p) => Some(p),
            _ => None,
        })
    }

    pub fn saw_partial(&self, text: &str) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ViewEvent::Partial(p) if p == text))
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl View for RecordingView {
    fn apply_controls(&self, visibility: &ControlVisibility) {
        self.push(ViewEvent::Controls(visibility.clone()));
    }

    fn clear_conversation(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn render_turn(&self, turn: &Turn) {
        self.push(ViewEvent::Turn(turn.speaker(), turn.text().to_string()));
    }

    fn set_typing(&self, typing: bool) {
        self.push(ViewEvent::Typing(typing));
    }

    fn show_notice(&self, notice: &str) {
        self.push(ViewEvent::Notice(notice.to_string()));
    }

    fn show_partial_transcript(&self, transcript: &str) {
        self.push(ViewEvent::Partial(transcript.to_string()));
    }

    fn clear_partial_transcript(&self) {
        self.push(ViewEvent::PartialCleared);
    }

    fn update_progress(&self, progress: &Progress) {
        self.push(ViewEvent::Progress(*progress));
    }
}

/// A relay whose replies are held back until the test releases them.
pub struct GatedRelay {
    gate: Semaphore,
    requests: Mutex<Vec<ChatRequest>>,
}

impl GatedRelay {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Lets one pending (or future) request complete.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        while self.request_count() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ChatRelay for GatedRelay {
    async fn send_turn(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        self.requests.lock().unwrap().push(request.clone());
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        permit.forget();
        Ok(format!("reply to {}", request.message))
    }
}
