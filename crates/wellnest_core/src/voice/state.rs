//! Voice activation state machine.
//!
//! # Responsibility
//! - Define the session states, input events and side-effect requests.
//! - Provide the pure `(state, event) -> transition` function that the
//!   session applies.
//!
//! # Invariants
//! - `Listening` is only entered from a rest state (`Idle`/`Ready`) or
//!   `Error` via `Activate`.
//! - Activation while `Listening` cancels; while `Processing` it is ignored.
//! - Cancel on a rest state is a no-op.
//! - Results are only published from `Processing`.
//! - The rest state is `Ready` when the model is loaded, `Idle` otherwise.

use crate::voice::capture::VoiceCaptureResult;

/// Current state of one voice capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceActivationState {
    /// No capture in progress.
    Idle,
    /// Microphone open, awaiting speech.
    Listening,
    /// Speech received, awaiting semantic parse.
    Processing,
    /// Model loaded but idle.
    Ready,
    /// Engine failure being surfaced.
    Error,
}

impl VoiceActivationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    /// Whether no capture is in flight and nothing needs acknowledging.
    pub fn is_at_rest(self) -> bool {
        matches!(self, Self::Idle | Self::Ready)
    }

    /// Whether a capture attempt is in flight.
    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Listening | Self::Processing)
    }
}

/// State plus the loaded-model flag that decides the rest state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineState {
    pub activation: VoiceActivationState,
    pub model_loaded: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            activation: VoiceActivationState::Idle,
            model_loaded: false,
        }
    }
}

impl MachineState {
    fn rest(self) -> VoiceActivationState {
        if self.model_loaded {
            VoiceActivationState::Ready
        } else {
            VoiceActivationState::Idle
        }
    }

    fn with(self, activation: VoiceActivationState) -> Self {
        Self { activation, ..self }
    }
}

/// One-shot user-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceNotice {
    PermissionDenied,
    Unavailable,
    NoSpeechDetected,
    MicrophoneBusy,
    EngineFailed(String),
    TimedOut,
}

impl VoiceNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::Unavailable => "unavailable",
            Self::NoSpeechDetected => "no_speech",
            Self::MicrophoneBusy => "microphone_busy",
            Self::EngineFailed(_) => "engine_failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Microphone permission is required for voice capture.".to_string()
            }
            Self::Unavailable => "Speech recognition is not available on this device.".to_string(),
            Self::NoSpeechDetected => "No speech detected. Try again.".to_string(),
            Self::MicrophoneBusy => "The microphone is already in use.".to_string(),
            Self::EngineFailed(details) => format!("Voice capture failed: {details}"),
            Self::TimedOut => "Voice capture timed out.".to_string(),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// User activation (mic tap, shake, voice button).
    Activate,
    /// User tap-to-cancel or overlay dismissal.
    Cancel,
    EndOfUtterance,
    ResultDelivered(VoiceCaptureResult),
    /// Engine finished without usable speech.
    NoSpeech,
    EngineFailed(String),
    /// The engine refused to open a capture; nothing was listening yet.
    StartFailed(String),
    AcknowledgeError,
    /// A listening/processing/error deadline passed.
    Timeout,
    ModelLoaded,
    ModelUnloaded,
}

impl VoiceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Cancel => "cancel",
            Self::EndOfUtterance => "end_of_utterance",
            Self::ResultDelivered(_) => "result_delivered",
            Self::NoSpeech => "no_speech",
            Self::EngineFailed(_) => "engine_failed",
            Self::StartFailed(_) => "start_failed",
            Self::AcknowledgeError => "acknowledge_error",
            Self::Timeout => "timeout",
            Self::ModelLoaded => "model_loaded",
            Self::ModelUnloaded => "model_unloaded",
        }
    }
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEffect {
    StartCapture,
    AbortCapture,
    PublishResult(VoiceCaptureResult),
    Notify(VoiceNotice),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: MachineState,
    pub effects: Vec<VoiceEffect>,
}

impl Transition {
    fn to(next: MachineState) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: VoiceEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether the visible activation state changed.
    pub fn changes_activation(&self, previous: MachineState) -> bool {
        self.next.activation != previous.activation
    }
}

/// Applies one event to a machine state.
pub fn transition(state: MachineState, event: VoiceEvent) -> Transition {
    use VoiceActivationState::{Error, Idle, Listening, Processing, Ready};

    let rest = state.rest();
    match (state.activation, event) {
        (Idle | Ready | Error, VoiceEvent::Activate) => {
            Transition::to(state.with(Listening)).with_effect(VoiceEffect::StartCapture)
        }
        (Listening, VoiceEvent::Activate) => {
            Transition::to(state.with(rest)).with_effect(VoiceEffect::AbortCapture)
        }
        (Processing, VoiceEvent::Activate) => Transition::to(state),

        (Listening | Processing, VoiceEvent::Cancel) => {
            Transition::to(state.with(rest)).with_effect(VoiceEffect::AbortCapture)
        }
        (Error, VoiceEvent::Cancel | VoiceEvent::AcknowledgeError) => {
            Transition::to(state.with(rest))
        }

        (Listening, VoiceEvent::EndOfUtterance) => Transition::to(state.with(Processing)),

        (Processing, VoiceEvent::ResultDelivered(result)) => {
            Transition::to(state.with(rest)).with_effect(VoiceEffect::PublishResult(result))
        }

        (Listening | Processing, VoiceEvent::NoSpeech) => Transition::to(state.with(rest))
            .with_effect(VoiceEffect::Notify(VoiceNotice::NoSpeechDetected)),

        (Listening | Processing, VoiceEvent::EngineFailed(details)) => {
            Transition::to(state.with(Error))
                .with_effect(VoiceEffect::AbortCapture)
                .with_effect(VoiceEffect::Notify(VoiceNotice::EngineFailed(details)))
        }

        (Idle | Ready | Error, VoiceEvent::StartFailed(details)) => {
            Transition::to(state.with(Error))
                .with_effect(VoiceEffect::Notify(VoiceNotice::EngineFailed(details)))
        }

        (Listening | Processing, VoiceEvent::Timeout) => Transition::to(state.with(rest))
            .with_effect(VoiceEffect::AbortCapture)
            .with_effect(VoiceEffect::Notify(VoiceNotice::TimedOut)),
        (Error, VoiceEvent::Timeout) => Transition::to(state.with(rest)),

        (activation, VoiceEvent::ModelLoaded) => {
            let loaded = MachineState {
                model_loaded: true,
                ..state
            };
            let next = if activation == Idle {
                loaded.with(Ready)
            } else {
                loaded
            };
            Transition::to(next)
        }
        (activation, VoiceEvent::ModelUnloaded) => {
            let unloaded = MachineState {
                model_loaded: false,
                ..state
            };
            let next = if activation == Ready {
                unloaded.with(Idle)
            } else {
                unloaded
            };
            Transition::to(next)
        }

        // Everything else is stale or out of order and leaves the state alone.
        _ => Transition::to(state),
    }
}
