//! Speech capture engine contract.
//!
//! The engine is the platform speech-to-text plugin. It reports completions
//! back through `VoiceSession` tagged with the ticket it was started with.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifies one activation of a session.
///
/// Engine callbacks carrying a ticket other than the current one are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionTicket(pub u64);

impl Display for SessionTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-side failure kinds reported mid-capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFailure {
    /// Engine heard nothing usable.
    NoSpeech,
    /// Permission was revoked while capturing.
    PermissionRevoked,
    Other(String),
}

impl Display for EngineFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSpeech => write!(f, "no speech detected"),
            Self::PermissionRevoked => write!(f, "microphone permission revoked"),
            Self::Other(details) => write!(f, "{details}"),
        }
    }
}

impl Error for EngineFailure {}

/// Platform speech engine.
pub trait SpeechEngine: Send + Sync {
    fn is_available(&self) -> bool;
    fn has_permission(&self) -> bool;
    /// Asks the platform for microphone permission; returns the outcome.
    fn request_permission(&self) -> bool;
    /// Opens the microphone for `ticket`. `hint` biases recognition.
    ///
    /// Callbacks for `ticket` are accepted only after this returns `Ok`.
    fn start_capture(&self, ticket: SessionTicket, hint: Option<&str>) -> Result<(), EngineFailure>;
    /// Aborts capture for `ticket`. Must tolerate already-finished tickets.
    fn abort_capture(&self, ticket: SessionTicket);
}
