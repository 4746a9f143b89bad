//! Voice-driven quick capture.
//!
//! # Responsibility
//! - Model the listen/parse/deliver lifecycle as an explicit state machine.
//! - Share one session across every capture surface and guarantee a single
//!   microphone owner.
//!
//! # Invariants
//! - State changes happen only through `state::transition`.
//! - At most one session is `Listening` per microphone arbiter.

pub mod capture;
pub mod engine;
pub mod lease;
pub mod session;
pub mod state;
pub mod surface;
