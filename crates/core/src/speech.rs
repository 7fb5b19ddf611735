//! Speech synthesis and recognition behind host-independent traits.
//!
//! The platform side is reduced to two small seams: a [`Synthesizer`] that
//! plays one utterance at a time, and a [`Recognizer`] that forwards its
//! callbacks into a channel. [`SpeechAdapter`] turns the recognizer's events
//! into a lazy [`CaptureStream`] of transcripts that the session can consume
//! with plain `.next().await`.

use crate::error::{CaptureError, SpeechError};
use crate::lesson::LanguageTag;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: LanguageTag,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    /// Slightly slower than normal speech so learners can follow along.
    pub const DEFAULT_RATE: f32 = 0.9;
    pub const DEFAULT_PITCH: f32 = 1.0;

    pub fn new(text: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            text: text.into(),
            language,
            rate: Self::DEFAULT_RATE,
            pitch: Self::DEFAULT_PITCH,
        }
    }
}

pub trait Synthesizer: Send + Sync {
    /// Starts playing the utterance and returns immediately.
    fn speak(&self, utterance: Utterance);
    /// Stops whatever is playing. Must be harmless when nothing is.
    fn cancel(&self);
}

/// Raw events from a platform recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Partial(String),
    Final(String),
    Error(String),
    End,
}

pub trait Recognizer: Send + Sync {
    /// Opens a recognition session in `language`. Platform callbacks are
    /// forwarded into the returned channel; dropping the receiver ends the
    /// platform session.
    fn open(
        &self,
        language: &LanguageTag,
        continuous: bool,
    ) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>, CaptureError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// The first final result ends the capture.
    Single,
    /// Keep listening (restarting the platform session if it ends on its own)
    /// until [`SpeechAdapter::stop_capture`] is called.
    #[default]
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    Partial(String),
    Final(String),
}

pub type CaptureStream = BoxStream<'static, Result<Transcript, CaptureError>>;

/// Transient state of one capture, dropped with its stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceCaptureState {
    pub active: bool,
    pub partial_transcript: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureSignal {
    Listening,
    /// Finish and hand over what was heard.
    Stopped,
    /// Finish and drop what was heard.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct CaptureControl {
    epoch: u64,
    signal: CaptureSignal,
}

pub struct SpeechAdapter {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    recognizer: Option<Arc<dyn Recognizer>>,
    utterance_pending: AtomicBool,
    control: Arc<watch::Sender<CaptureControl>>,
}

impl SpeechAdapter {
    /// Either capability may be missing; the adapter degrades to no-ops.
    pub fn new(
        synthesizer: Option<Arc<dyn Synthesizer>>,
        recognizer: Option<Arc<dyn Recognizer>>,
    ) -> Self {
        let (control, _) = watch::channel(CaptureControl {
            epoch: 0,
            signal: CaptureSignal::Cancelled,
        });
        Self {
            synthesizer,
            recognizer,
            utterance_pending: AtomicBool::new(false),
            control: Arc::new(control),
        }
    }

    pub fn can_speak(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn can_capture(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Plays `text`, cutting off any utterance that is still playing.
    pub fn try_speak(&self, text: &str, language: &LanguageTag) -> Result<(), SpeechError> {
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or(SpeechError::PlaybackUnavailable)?;
        if self.utterance_pending.swap(true, Ordering::SeqCst) {
            synthesizer.cancel();
        }
        synthesizer.speak(Utterance::new(text, language.clone()));
        Ok(())
    }

    /// Like [`Self::try_speak`], but a missing synthesizer is only logged.
    pub fn speak(&self, text: &str, language: &LanguageTag) {
        if let Err(e) = self.try_speak(text, language) {
            tracing::warn!("Skipping narration: {e}");
        }
    }

    pub fn cancel_playback(&self) {
        if self.utterance_pending.swap(false, Ordering::SeqCst) {
            if let Some(synthesizer) = &self.synthesizer {
                synthesizer.cancel();
            }
        }
    }

    /// Begins a new capture, superseding any previous one and cutting off
    /// playback. Nothing is opened on the platform until the stream is polled.
    pub fn start_capture(&self, language: &LanguageTag, mode: CaptureMode) -> CaptureStream {
        let Some(recognizer) = self.recognizer.clone() else {
            tracing::warn!("Voice capture requested but no recognizer is available");
            return stream::once(async { Err(CaptureError::Unavailable) }).boxed();
        };

        self.cancel_playback();

        let mut epoch = 0;
        self.control.send_modify(|control| {
            control.epoch += 1;
            control.signal = CaptureSignal::Listening;
            epoch = control.epoch;
        });
        tracing::debug!(epoch, language = %language, ?mode, "Starting voice capture");

        let cursor = CaptureCursor {
            recognizer,
            language: language.clone(),
            mode,
            epoch,
            control: self.control.clone(),
            signals: self.control.subscribe(),
            events: None,
            state: VoiceCaptureState {
                active: true,
                partial_transcript: String::new(),
            },
            committed: String::new(),
        };
        stream::unfold(cursor, CaptureCursor::advance).boxed()
    }

    /// Ends the current capture; its stream yields the final transcript.
    /// Safe to call when nothing is being captured.
    pub fn stop_capture(&self) {
        self.signal_capture(CaptureSignal::Stopped);
    }

    /// Ends the current capture and discards the partial transcript.
    pub fn cancel_capture(&self) {
        self.signal_capture(CaptureSignal::Cancelled);
    }

    pub fn cancel_all(&self) {
        self.cancel_playback();
        self.cancel_capture();
    }

    pub fn is_capturing(&self) -> bool {
        self.control.borrow().signal == CaptureSignal::Listening
    }

    fn signal_capture(&self, signal: CaptureSignal) {
        self.control.send_if_modified(|control| {
            if control.signal == CaptureSignal::Listening {
                control.signal = signal;
                true
            } else {
                false
            }
        });
    }
}

enum Step {
    Signal,
    Event(Option<RecognitionEvent>),
}

struct CaptureCursor {
    recognizer: Arc<dyn Recognizer>,
    language: LanguageTag,
    mode: CaptureMode,
    epoch: u64,
    control: Arc<watch::Sender<CaptureControl>>,
    signals: watch::Receiver<CaptureControl>,
    events: Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
    state: VoiceCaptureState,
    /// Final results already received in continuous mode.
    committed: String,
}

type Advance = Option<(Result<Transcript, CaptureError>, CaptureCursor)>;

impl CaptureCursor {
    async fn advance(mut self) -> Advance {
        loop {
            if !self.state.active {
                return None;
            }

            let control = *self.signals.borrow_and_update();
            if control.epoch != self.epoch || control.signal == CaptureSignal::Cancelled {
                tracing::debug!(epoch = self.epoch, "Voice capture cancelled");
                self.discard();
                return self.close(None);
            }
            if control.signal == CaptureSignal::Stopped {
                let transcript = self.transcript();
                return self.close(final_item(transcript));
            }

            if self.events.is_none() {
                let continuous = self.mode == CaptureMode::Continuous;
                match self.recognizer.open(&self.language, continuous) {
                    Ok(events) => self.events = Some(events),
                    Err(e) => {
                        tracing::warn!("Could not open speech recognition: {e}");
                        self.discard();
                        return self.close(Some(Err(e)));
                    }
                }
            }

            let step = match self.events.as_mut() {
                Some(events) => tokio::select! {
                    biased;
                    _ = wait_until_inactive(&mut self.signals, self.epoch) => Step::Signal,
                    event = events.recv() => Step::Event(event),
                },
                None => continue,
            };

            match step {
                Step::Signal => continue,
                Step::Event(Some(RecognitionEvent::Partial(text))) => {
                    self.state.partial_transcript = text;
                    let transcript = self.transcript();
                    return Some((Ok(Transcript::Partial(transcript)), self));
                }
                Step::Event(Some(RecognitionEvent::Final(text))) => match self.mode {
                    CaptureMode::Single => {
                        self.discard();
                        return self.close(final_item(text));
                    }
                    CaptureMode::Continuous => {
                        self.state.partial_transcript = text;
                        self.commit_partial();
                        let transcript = self.transcript();
                        return Some((Ok(Transcript::Partial(transcript)), self));
                    }
                },
                Step::Event(Some(RecognitionEvent::Error(message))) => {
                    tracing::warn!("Speech recognition error: {message}");
                    self.discard();
                    return self.close(Some(Err(CaptureError::Recognition(message))));
                }
                Step::Event(Some(RecognitionEvent::End)) | Step::Event(None) => {
                    self.events = None;
                    if self.mode == CaptureMode::Single {
                        let transcript = self.transcript();
                        return self.close(final_item(transcript));
                    }
                    tracing::debug!(epoch = self.epoch, "Recognition ended while listening, restarting");
                    self.commit_partial();
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    fn transcript(&self) -> String {
        [self.committed.trim(), self.state.partial_transcript.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn commit_partial(&mut self) {
        let partial = std::mem::take(&mut self.state.partial_transcript);
        let partial = partial.trim();
        if partial.is_empty() {
            return;
        }
        if !self.committed.is_empty() {
            self.committed.push(' ');
        }
        self.committed.push_str(partial);
    }

    fn discard(&mut self) {
        self.committed.clear();
        self.state.partial_transcript.clear();
    }

    /// Marks the capture finished and yields `item` as the last element.
    fn close(mut self, item: Option<Result<Transcript, CaptureError>>) -> Advance {
        self.state.active = false;
        self.events = None;
        let epoch = self.epoch;
        self.control.send_if_modified(|control| {
            if control.epoch == epoch && control.signal == CaptureSignal::Listening {
                control.signal = CaptureSignal::Stopped;
                true
            } else {
                false
            }
        });
        item.map(|item| (item, self))
    }
}

fn final_item(text: String) -> Option<Result<Transcript, CaptureError>> {
    let text = text.trim();
    (!text.is_empty()).then(|| Ok(Transcript::Final(text.to_string())))
}

/// Resolves once capture `epoch` is no longer listening.
async fn wait_until_inactive(signals: &mut watch::Receiver<CaptureControl>, epoch: u64) {
    loop {
        let control = *signals.borrow_and_update();
        if control.epoch != epoch || control.signal != CaptureSignal::Listening {
            return;
        }
        if signals.changed().await.is_err() {
            // The adapter is gone; only the recognizer can end the capture now.
            std::future::pending::<()>().await;
        }
    }
}
