use crate::error::{SessionError, UpstreamError, ValidationError};
use crate::lesson::LessonSettings;
use crate::relay::ChatRelay;
use crate::speech::{CaptureMode, SpeechAdapter, Transcript};
use crate::turn::Turn;
use crate::view::{ControlVisibility, Progress, View};
use crate::wire::ChatRequest;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shown when the learner pauses the conversation.
pub const PAUSE_NOTICE: &str = "Conversation paused. Click \"Start Conversation\" to begin a new session or \"Reset\" to clear the current conversation.";
/// Shown in the empty conversation area while idle.
pub const IDLE_NOTICE: &str = "Click \"Start Conversation\" to begin...";
/// Prefix of the system turn appended when the tutor could not answer.
pub const REPLY_FAILED: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Active,
    Paused,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
        })
    }
}

/// What became of a tutor request.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The tutor answered; the reply was appended and narrated.
    Replied(Turn),
    /// The relay failed; a system turn describing the failure was appended.
    Failed(Turn),
    /// The session was stopped, reset or restarted while waiting. Nothing
    /// was appended or spoken.
    Discarded,
}

/// A read-only copy of the session, for rendering and tests.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub message_count: u32,
    pub last_tutor_reply: String,
    pub turns: Vec<Turn>,
    pub awaiting_reply: bool,
    pub settings: LessonSettings,
}

struct SessionState {
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    message_count: u32,
    last_tutor_reply: String,
    turns: Vec<Turn>,
    settings: LessonSettings,
    // Bumped by start, stop and reset so late replies can tell they are stale.
    generation: u64,
    awaiting_reply: bool,
}

impl SessionState {
    fn progress(&self) -> Progress {
        Progress {
            message_count: self.message_count,
            elapsed: self
                .started_at
                .and_then(|started| (Utc::now() - started).to_std().ok()),
        }
    }
}

/// The conversation lifecycle: Idle -> Active -> Paused, and back to Idle on reset.
///
/// `TutorSession` is a cheap handle; clones share the same conversation. The
/// state lock is never held while waiting on the relay, so `stop` and `reset`
/// can run while a reply is outstanding.
#[derive(Clone)]
pub struct TutorSession {
    state: Arc<Mutex<SessionState>>,
    relay: Arc<dyn ChatRelay>,
    speech: Arc<SpeechAdapter>,
    view: Arc<dyn View>,
}

impl TutorSession {
    pub fn new(
        settings: LessonSettings,
        relay: Arc<dyn ChatRelay>,
        speech: Arc<SpeechAdapter>,
        view: Arc<dyn View>,
    ) -> Self {
        let state = SessionState {
            status: SessionStatus::Idle,
            started_at: None,
            message_count: 0,
            last_tutor_reply: String::new(),
            turns: Vec::new(),
            settings,
            generation: 0,
            awaiting_reply: false,
        };
        view.apply_controls(&ControlVisibility::for_status(SessionStatus::Idle));
        view.show_notice(IDLE_NOTICE);
        Self {
            state: Arc::new(Mutex::new(state)),
            relay,
            speech,
            view,
        }
    }

    /// Starts a fresh conversation and asks the tutor for a greeting.
    ///
    /// Valid from `Idle` and `Paused`. The greeting counts as one message.
    pub async fn start(&self) -> Result<SendOutcome, SessionError> {
        let (request, generation) = {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Active {
                return Err(SessionError::InvalidTransition {
                    action: "start",
                    status: state.status,
                });
            }

            self.speech.cancel_all();
            state.generation += 1;
            state.status = SessionStatus::Active;
            state.started_at = Some(Utc::now());
            state.message_count = 0;
            state.last_tutor_reply.clear();
            state.turns.clear();
            state.awaiting_reply = true;

            self.view.clear_conversation();
            self.view
                .apply_controls(&ControlVisibility::for_status(SessionStatus::Active));
            self.view.update_progress(&state.progress());
            self.view.set_typing(true);

            let greeting = state.settings.greeting_prompt();
            (
                ChatRequest::new(&state.settings, greeting),
                state.generation,
            )
        };

        tracing::info!(
            generation,
            language = %request.target_language,
            "Conversation started, requesting greeting"
        );
        let result = self.relay.send_turn(&request).await;
        Ok(self.complete_reply(generation, result, 1).await)
    }

    /// Pauses the conversation: speech is cut off, input is disabled and the
    /// history is kept.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Active {
            return Err(SessionError::InvalidTransition {
                action: "stop",
                status: state.status,
            });
        }

        self.speech.cancel_all();
        state.generation += 1;
        state.status = SessionStatus::Paused;
        state.awaiting_reply = false;

        self.view.set_typing(false);
        self.view.clear_partial_transcript();
        self.view
            .apply_controls(&ControlVisibility::for_status(SessionStatus::Paused));
        self.view.show_notice(PAUSE_NOTICE);
        tracing::info!(turns = state.turns.len(), "Conversation paused");
        Ok(())
    }

    /// Drops the conversation and returns to `Idle`, whatever the current state.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;

        self.speech.cancel_all();
        state.generation += 1;
        state.status = SessionStatus::Idle;
        state.started_at = None;
        state.message_count = 0;
        state.last_tutor_reply.clear();
        state.turns.clear();
        state.awaiting_reply = false;

        self.view.set_typing(false);
        self.view.clear_partial_transcript();
        self.view.clear_conversation();
        self.view
            .apply_controls(&ControlVisibility::for_status(SessionStatus::Idle));
        self.view.update_progress(&state.progress());
        self.view.show_notice(IDLE_NOTICE);
        tracing::info!("Conversation reset");
    }

    /// Sends a learner message and waits for the tutor's reply.
    ///
    /// Rejected without touching the network when the text is blank, the
    /// session is not active, or another reply is still outstanding.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let (request, generation) = {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Active {
                return Err(SessionError::InvalidTransition {
                    action: "send a message",
                    status: state.status,
                });
            }
            if state.awaiting_reply {
                tracing::debug!("Ignoring message while a reply is outstanding");
                return Err(SessionError::Busy);
            }

            let turn = Turn::user(text);
            self.view.render_turn(&turn);
            state.turns.push(turn);
            state.awaiting_reply = true;
            self.view.set_typing(true);

            (ChatRequest::new(&state.settings, text), state.generation)
        };

        let result = self.relay.send_turn(&request).await;
        Ok(self.complete_reply(generation, result, 2).await)
    }

    /// Narrates the last tutor reply again. Returns whether anything was spoken.
    pub async fn replay(&self) -> bool {
        let state = self.state.lock().await;
        if state.status != SessionStatus::Active || state.last_tutor_reply.is_empty() {
            return false;
        }
        self.speech
            .speak(&state.last_tutor_reply, &state.settings.target_language);
        true
    }

    /// Listens to the learner and sends what they said as a message.
    ///
    /// Partial transcripts are forwarded to the view as they arrive. The
    /// capture keeps going until [`Self::stop_voice`] is called; `Ok(None)`
    /// means it ended without any speech, or was cancelled by stop/reset.
    pub async fn capture_voice(&self) -> Result<Option<SendOutcome>, SessionError> {
        let language = {
            let state = self.state.lock().await;
            if state.status != SessionStatus::Active {
                return Err(SessionError::InvalidTransition {
                    action: "capture voice",
                    status: state.status,
                });
            }
            state.settings.target_language.clone()
        };

        let mut transcripts = self
            .speech
            .start_capture(&language, CaptureMode::Continuous);
        while let Some(item) = transcripts.next().await {
            match item {
                Ok(Transcript::Partial(text)) => self.view.show_partial_transcript(&text),
                Ok(Transcript::Final(text)) => {
                    self.view.clear_partial_transcript();
                    return self.send_message(&text).await.map(Some);
                }
                Err(e) => {
                    tracing::warn!("Voice capture failed: {e}");
                    self.view.clear_partial_transcript();
                    return Err(e.into());
                }
            }
        }

        self.view.clear_partial_transcript();
        Ok(None)
    }

    /// Finishes the current voice capture. Safe to call at any time.
    pub fn stop_voice(&self) {
        self.speech.stop_capture();
    }

    /// Replaces the lesson settings. Only allowed while no conversation is active.
    pub async fn update_settings(&self, settings: LessonSettings) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.status == SessionStatus::Active {
            return Err(SessionError::InvalidTransition {
                action: "change lesson settings",
                status: state.status,
            });
        }
        state.settings = settings;
        Ok(())
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn progress(&self) -> Progress {
        self.state.lock().await.progress()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            status: state.status,
            started_at: state.started_at,
            message_count: state.message_count,
            last_tutor_reply: state.last_tutor_reply.clone(),
            turns: state.turns.clone(),
            awaiting_reply: state.awaiting_reply,
            settings: state.settings.clone(),
        }
    }

    // Applies a relay result, unless the session moved on while we waited.
    async fn complete_reply(
        &self,
        generation: u64,
        result: Result<String, UpstreamError>,
        credit: u32,
    ) -> SendOutcome {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.status != SessionStatus::Active {
            tracing::debug!(
                generation,
                current = state.generation,
                "Discarding tutor reply for a finished conversation"
            );
            return SendOutcome::Discarded;
        }

        state.awaiting_reply = false;
        self.view.set_typing(false);

        let outcome = match result {
            Ok(reply) => {
                let turn = Turn::tutor(reply.as_str());
                self.view.render_turn(&turn);
                self.speech
                    .speak(&reply, &state.settings.target_language);
                state.turns.push(turn.clone());
                state.message_count += credit;
                state.last_tutor_reply = reply;
                SendOutcome::Replied(turn)
            }
            Err(e) => {
                tracing::error!(status = ?e.status(), "Tutor reply failed: {e}");
                let turn = Turn::system(format!("{REPLY_FAILED} ({e})"));
                self.view.render_turn(&turn);
                state.turns.push(turn.clone());
                SendOutcome::Failed(turn)
            }
        };
        self.view.update_progress(&state.progress());
        outcome
    }
}
