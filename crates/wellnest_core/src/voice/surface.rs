//! Capture surfaces attached to the shared voice session.
//!
//! A surface is one UI consumer (full-screen overlay or inline mic button).
//! Each surface owns its own broadcast subscriptions; all of them talk to
//! the same `VoiceSession`, so they can never run competing captures.

use crate::voice::capture::VoiceCaptureResult;
use crate::voice::session::{ActivationOutcome, VoiceSession};
use crate::voice::state::{VoiceActivationState, VoiceNotice};
use log::warn;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Full-screen overlay; tapping anywhere cancels.
    Overlay,
    /// Small mic button; pressing again while listening cancels.
    InlineButton,
}

impl SurfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overlay => "overlay",
            Self::InlineButton => "inline_button",
        }
    }
}

/// One surface's view of the shared session.
pub struct VoiceSurface {
    kind: SurfaceKind,
    session: Arc<VoiceSession>,
    states: Receiver<VoiceActivationState>,
    results: Receiver<VoiceCaptureResult>,
    notices: Receiver<VoiceNotice>,
    last_state: VoiceActivationState,
}

impl VoiceSurface {
    /// Subscribes a new surface to `session`.
    pub fn attach(kind: SurfaceKind, session: Arc<VoiceSession>) -> Self {
        let states = session.subscribe_states();
        let results = session.subscribe_results();
        let notices = session.subscribe_notices();
        let last_state = session.state();
        Self {
            kind,
            session,
            states,
            results,
            notices,
            last_state,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Mic button press (or voice-button press on the overlay).
    pub fn press(&mut self) -> ActivationOutcome {
        self.session.activate(None)
    }

    /// Press with a recognition hint, e.g. the current list name.
    pub fn press_with_hint(&mut self, hint: &str) -> ActivationOutcome {
        self.session.activate(Some(hint))
    }

    /// Shake gesture. Only activates when enabled in config.
    pub fn shake(&mut self) -> Option<ActivationOutcome> {
        if !self.session.config().shake_to_activate {
            return None;
        }
        Some(self.session.activate(None))
    }

    /// Tap anywhere on the overlay.
    ///
    /// Cancels an in-flight capture and acknowledges a surfaced error.
    /// Does nothing on the inline button.
    pub fn tap(&mut self) {
        if self.kind != SurfaceKind::Overlay {
            return;
        }
        match self.session.state() {
            VoiceActivationState::Error => self.session.acknowledge_error(),
            // At rest this only reaches a capture that is still being opened.
            _ => self.session.cancel(),
        }
    }

    /// Overlay dismissed: drop any capture and clear any error.
    pub fn dismiss(&mut self) {
        self.session.cancel();
        self.session.acknowledge_error();
    }

    /// Last state this surface has observed via `drain_states`.
    pub fn last_state(&self) -> VoiceActivationState {
        self.last_state
    }

    /// Whether the listening pulse animation should run.
    pub fn pulse_active(&self) -> bool {
        self.last_state == VoiceActivationState::Listening
    }

    /// Returns states broadcast since the previous drain, oldest first.
    pub fn drain_states(&mut self) -> Vec<VoiceActivationState> {
        let drained = drain(&mut self.states, self.kind, "states");
        if let Some(last) = drained.last() {
            self.last_state = *last;
        }
        drained
    }

    pub fn drain_results(&mut self) -> Vec<VoiceCaptureResult> {
        drain(&mut self.results, self.kind, "results")
    }

    pub fn drain_notices(&mut self) -> Vec<VoiceNotice> {
        drain(&mut self.notices, self.kind, "notices")
    }
}

fn drain<T: Clone>(receiver: &mut Receiver<T>, kind: SurfaceKind, stream: &str) -> Vec<T> {
    let mut items = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(item) => items.push(item),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(
                    "event=voice_surface module=voice status=lagged surface={} stream={} skipped={}",
                    kind.as_str(),
                    stream,
                    skipped
                );
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    items
}
