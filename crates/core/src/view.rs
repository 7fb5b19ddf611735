use crate::session_state::SessionStatus;
use crate::turn::Turn;
use std::collections::BTreeSet;
use std::time::Duration;

/// The buttons and inputs whose visibility depends on the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    Start,
    Stop,
    Reset,
    Send,
    Speak,
    Replay,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Start,
        Control::Stop,
        Control::Reset,
        Control::Send,
        Control::Speak,
        Control::Replay,
    ];
}

/// The show/hide directive emitted on every session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlVisibility {
    shown: BTreeSet<Control>,
}

impl ControlVisibility {
    pub fn for_status(status: SessionStatus) -> Self {
        let shown: &[Control] = match status {
            SessionStatus::Idle => &[Control::Start],
            SessionStatus::Active => &[
                Control::Stop,
                Control::Reset,
                Control::Send,
                Control::Speak,
                Control::Replay,
            ],
            SessionStatus::Paused => &[Control::Start, Control::Reset],
        };
        Self {
            shown: shown.iter().copied().collect(),
        }
    }

    pub fn is_shown(&self, control: Control) -> bool {
        self.shown.contains(&control)
    }

    pub fn shown(&self) -> impl Iterator<Item = Control> + '_ {
        self.shown.iter().copied()
    }

    pub fn hidden(&self) -> impl Iterator<Item = Control> + '_ {
        Control::ALL
            .into_iter()
            .filter(|control| !self.shown.contains(control))
    }
}

/// Progress bar and counters shown under the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub message_count: u32,
    pub elapsed: Option<Duration>,
}

impl Progress {
    /// Messages needed to fill the progress bar.
    pub const FULL_AT: u32 = 100;

    pub fn percent(&self) -> u8 {
        (self.message_count.min(Self::FULL_AT) * 100 / Self::FULL_AT) as u8
    }

    /// Elapsed session time as `m:ss`, if a session has started.
    pub fn session_time(&self) -> Option<String> {
        self.elapsed.map(|elapsed| {
            let secs = elapsed.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        })
    }
}

/// Everything the session needs from whatever renders it.
///
/// The session never looks anything up in the presentation layer; it only
/// pushes directives through this trait.
pub trait View: Send + Sync {
    fn apply_controls(&self, visibility: &ControlVisibility);
    fn clear_conversation(&self);
    fn render_turn(&self, turn: &Turn);
    fn set_typing(&self, typing: bool);
    fn show_notice(&self, notice: &str);
    fn show_partial_transcript(&self, transcript: &str);
    fn clear_partial_transcript(&self);
    fn update_progress(&self, progress: &Progress);
}
