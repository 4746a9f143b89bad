//! Shared voice capture session.
//!
//! # Responsibility
//! - Own the single mutable voice state and apply `state::transition` to it.
//! - Broadcast state changes, capture results and one-shot notices to every
//!   attached surface.
//! - Drive the speech engine (start/abort) and arbitrate the microphone.
//!
//! # Invariants
//! - The session holds a microphone lease while a capture is being opened and
//!   while `Listening`. A lease leaving `Listening` through an abort is only
//!   released after the engine has closed the capture.
//! - `Listening` is committed only after `start_capture` succeeded, and an
//!   abort for a ticket can only be issued once its start has returned.
//! - Engine callbacks for any ticket but the current one are discarded, so
//!   nothing cancelled can still produce a result.
//! - Engine calls are made without holding the state lock.
//! - Permission denial never changes the state; it only emits a notice.

use crate::config::VoiceConfig;
use crate::voice::capture::{CaptureParseError, VoiceCaptureResult};
use crate::voice::engine::{EngineFailure, SessionTicket, SpeechEngine};
use crate::voice::lease::{MicrophoneArbiter, MicrophoneLease};
use crate::voice::state::{
    transition, MachineState, Transition, VoiceActivationState, VoiceEffect, VoiceEvent,
    VoiceNotice,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const STATE_CHANNEL_CAPACITY: usize = 32;
const RESULT_CHANNEL_CAPACITY: usize = 8;
const NOTICE_CHANNEL_CAPACITY: usize = 16;
const MIN_WATCHDOG_PERIOD: Duration = Duration::from_millis(10);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// What an activation request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Listening started under this ticket.
    Started(SessionTicket),
    /// The session was listening; the request toggled it off.
    Cancelled,
    /// The session was processing; the request was dropped.
    Ignored,
    PermissionDenied,
    Unavailable,
    MicrophoneBusy,
    /// The engine refused to start; the failure was surfaced as a notice.
    Failed,
}

/// Engine abort deferred until the state lock is released.
struct PendingAbort {
    ticket: SessionTicket,
    lease: Option<MicrophoneLease>,
}

/// Capture handed to the engine but not yet committed as `Listening`.
struct PendingStart {
    ticket: SessionTicket,
    cancel_requested: bool,
}

struct SessionInner {
    machine: MachineState,
    current: Option<SessionTicket>,
    last_ticket: u64,
    entered_at: Instant,
    lease: Option<MicrophoneLease>,
    starting: Option<PendingStart>,
}

/// One logical voice session shared by every capture surface.
pub struct VoiceSession {
    id: u64,
    engine: Arc<dyn SpeechEngine>,
    config: VoiceConfig,
    arbiter: Arc<MicrophoneArbiter>,
    inner: Mutex<SessionInner>,
    state_tx: broadcast::Sender<VoiceActivationState>,
    result_tx: broadcast::Sender<VoiceCaptureResult>,
    notice_tx: broadcast::Sender<VoiceNotice>,
}

impl VoiceSession {
    /// Creates a session arbitrated by the process-wide microphone arbiter.
    pub fn new(engine: Arc<dyn SpeechEngine>, config: VoiceConfig) -> Arc<Self> {
        Self::with_arbiter(engine, config, MicrophoneArbiter::process_wide())
    }

    pub fn with_arbiter(
        engine: Arc<dyn SpeechEngine>,
        config: VoiceConfig,
        arbiter: Arc<MicrophoneArbiter>,
    ) -> Arc<Self> {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let (result_tx, _) = broadcast::channel(RESULT_CHANNEL_CAPACITY);
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Arc::new(Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            engine,
            config,
            arbiter,
            inner: Mutex::new(SessionInner {
                machine: MachineState::default(),
                current: None,
                last_ticket: 0,
                entered_at: Instant::now(),
                lease: None,
                starting: None,
            }),
            state_tx,
            result_tx,
            notice_tx,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn state(&self) -> VoiceActivationState {
        self.lock().machine.activation
    }

    /// Ticket of the in-flight capture, if any.
    pub fn current_ticket(&self) -> Option<SessionTicket> {
        self.lock().current
    }

    pub fn subscribe_states(&self) -> broadcast::Receiver<VoiceActivationState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_results(&self) -> broadcast::Receiver<VoiceCaptureResult> {
        self.result_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<VoiceNotice> {
        self.notice_tx.subscribe()
    }

    /// Handles a user activation.
    ///
    /// # Contract
    /// - `Listening`, or a capture still being opened: toggles to cancel.
    /// - `Processing`: ignored.
    /// - Otherwise checks availability and permission, takes the microphone
    ///   and opens a capture under a fresh ticket. `Listening` is entered
    ///   only once the engine accepted the start.
    pub fn activate(&self, hint: Option<&str>) -> ActivationOutcome {
        {
            let mut inner = self.lock();
            if let Some(pending) = inner.starting.as_mut() {
                pending.cancel_requested = true;
                debug!(
                    "event=voice_activate module=voice status=cancel_requested ticket={}",
                    pending.ticket
                );
                return ActivationOutcome::Cancelled;
            }
            match inner.machine.activation {
                VoiceActivationState::Listening => {
                    let abort = self.apply(&mut inner, VoiceEvent::Activate);
                    drop(inner);
                    self.run_aborts(abort);
                    return ActivationOutcome::Cancelled;
                }
                VoiceActivationState::Processing => {
                    debug!("event=voice_activate module=voice status=ignored state=processing");
                    return ActivationOutcome::Ignored;
                }
                _ => {}
            }
        }

        if !self.engine.is_available() {
            self.notify(VoiceNotice::Unavailable);
            return ActivationOutcome::Unavailable;
        }
        if !self.engine.has_permission() && !self.engine.request_permission() {
            self.notify(VoiceNotice::PermissionDenied);
            return ActivationOutcome::PermissionDenied;
        }

        let (ticket, lease) = {
            let mut inner = self.lock();
            if inner.starting.is_some() || inner.machine.activation.is_capturing() {
                // Another surface won the race while permission was checked.
                return ActivationOutcome::Ignored;
            }
            let lease = match self.arbiter.try_acquire(self.id) {
                Ok(lease) => lease,
                Err(holder) => {
                    warn!(
                        "event=voice_activate module=voice status=busy session={} holder={}",
                        self.id, holder
                    );
                    self.notify(VoiceNotice::MicrophoneBusy);
                    return ActivationOutcome::MicrophoneBusy;
                }
            };
            inner.last_ticket += 1;
            let ticket = SessionTicket(inner.last_ticket);
            inner.starting = Some(PendingStart {
                ticket,
                cancel_requested: false,
            });
            (ticket, lease)
        };

        let started = self.engine.start_capture(ticket, hint);

        let mut inner = self.lock();
        let cancel_requested = inner
            .starting
            .take()
            .is_some_and(|pending| pending.cancel_requested);
        match started {
            Ok(()) if cancel_requested => {
                drop(inner);
                info!(
                    "event=voice_capture module=voice status=cancelled stage=start session={} ticket={}",
                    self.id, ticket
                );
                self.run_aborts(Some(PendingAbort {
                    ticket,
                    lease: Some(lease),
                }));
                ActivationOutcome::Cancelled
            }
            Ok(()) => {
                inner.current = Some(ticket);
                inner.lease = Some(lease);
                let abort = self.apply(&mut inner, VoiceEvent::Activate);
                drop(inner);
                self.run_aborts(abort);
                ActivationOutcome::Started(ticket)
            }
            Err(failure) => {
                drop(lease);
                warn!(
                    "event=voice_capture module=voice status=error stage=start session={} ticket={} error={}",
                    self.id, ticket, failure
                );
                if cancel_requested {
                    return ActivationOutcome::Cancelled;
                }
                match failure {
                    EngineFailure::PermissionRevoked => {
                        drop(inner);
                        self.notify(VoiceNotice::PermissionDenied);
                        ActivationOutcome::PermissionDenied
                    }
                    EngineFailure::NoSpeech => {
                        drop(inner);
                        self.notify(VoiceNotice::NoSpeechDetected);
                        ActivationOutcome::Failed
                    }
                    EngineFailure::Other(details) => {
                        let abort = self.apply(&mut inner, VoiceEvent::StartFailed(details));
                        drop(inner);
                        self.run_aborts(abort);
                        ActivationOutcome::Failed
                    }
                }
            }
        }
    }

    /// User cancel. No-op when nothing is in flight.
    ///
    /// A capture still being opened is closed as soon as its start returns.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if let Some(pending) = inner.starting.as_mut() {
            pending.cancel_requested = true;
            return;
        }
        let abort = self.apply(&mut inner, VoiceEvent::Cancel);
        drop(inner);
        self.run_aborts(abort);
    }

    /// Dismisses a surfaced error.
    pub fn acknowledge_error(&self) {
        self.apply_and_run(VoiceEvent::AcknowledgeError);
    }

    pub fn model_loaded(&self) {
        self.apply_and_run(VoiceEvent::ModelLoaded);
    }

    pub fn model_unloaded(&self) {
        self.apply_and_run(VoiceEvent::ModelUnloaded);
    }

    /// Engine signal: the speaker stopped talking.
    pub fn end_of_utterance(&self, ticket: SessionTicket) -> bool {
        self.dispatch(ticket, vec![VoiceEvent::EndOfUtterance])
    }

    /// Engine signal: the semantic parse finished.
    ///
    /// A missing title counts as no speech; any other parse error is an
    /// engine failure. Returns `false` when the ticket is stale.
    pub fn deliver_result(
        &self,
        ticket: SessionTicket,
        parsed: Result<VoiceCaptureResult, CaptureParseError>,
    ) -> bool {
        let event = match parsed {
            Ok(result) => VoiceEvent::ResultDelivered(result),
            Err(CaptureParseError::MissingTitle) => VoiceEvent::NoSpeech,
            Err(other) => VoiceEvent::EngineFailed(other.to_string()),
        };
        // Engines that skip the end-of-utterance signal still pass through
        // `Processing` before the result lands.
        let events = if matches!(event, VoiceEvent::ResultDelivered(_)) {
            vec![VoiceEvent::EndOfUtterance, event]
        } else {
            vec![event]
        };
        self.dispatch(ticket, events)
    }

    /// Engine signal: capture failed mid-flight. Never retried.
    pub fn report_failure(&self, ticket: SessionTicket, failure: EngineFailure) -> bool {
        let event = match failure {
            EngineFailure::NoSpeech => VoiceEvent::NoSpeech,
            other => VoiceEvent::EngineFailed(other.to_string()),
        };
        self.dispatch(ticket, vec![event])
    }

    /// Applies configured deadlines as of `now`.
    ///
    /// Listening/processing past their timeout are cancelled with a
    /// `TimedOut` notice; an unacknowledged error resets to rest.
    pub fn expire_stale(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        let deadline = match inner.machine.activation {
            VoiceActivationState::Listening => self.config.listen_timeout(),
            VoiceActivationState::Processing => self.config.processing_timeout(),
            VoiceActivationState::Error => self.config.error_reset(),
            VoiceActivationState::Idle | VoiceActivationState::Ready => return false,
        };
        if now.saturating_duration_since(inner.entered_at) < deadline {
            return false;
        }
        info!(
            "event=voice_timeout module=voice status=expired state={}",
            inner.machine.activation.as_str()
        );
        let abort = self.apply(&mut inner, VoiceEvent::Timeout);
        drop(inner);
        self.run_aborts(abort);
        true
    }

    /// `expire_stale` against the current clock, for hosts without a
    /// watchdog task.
    pub fn expire_now(&self) -> bool {
        self.expire_stale(Instant::now())
    }

    /// Spawns a task that calls `expire_stale` every `period`.
    ///
    /// The task holds a weak reference and exits once the session is dropped.
    pub fn spawn_watchdog(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        let period = period.max(MIN_WATCHDOG_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.expire_stale(Instant::now());
            }
        })
    }

    fn dispatch(&self, ticket: SessionTicket, events: Vec<VoiceEvent>) -> bool {
        let mut inner = self.lock();
        if inner.current != Some(ticket) {
            debug!(
                "event=voice_callback module=voice status=discarded ticket={} current={:?}",
                ticket,
                inner.current.map(|value| value.0)
            );
            return false;
        }
        let mut aborts = Vec::new();
        for event in events {
            aborts.extend(self.apply(&mut inner, event));
        }
        drop(inner);
        self.run_aborts(aborts);
        true
    }

    fn apply_and_run(&self, event: VoiceEvent) {
        let mut inner = self.lock();
        let abort = self.apply(&mut inner, event);
        drop(inner);
        self.run_aborts(abort);
    }

    /// Applies one event under the lock and returns the abort to run after
    /// the lock is released.
    fn apply(&self, inner: &mut SessionInner, event: VoiceEvent) -> Option<PendingAbort> {
        let previous = inner.machine;
        let trigger = event.name();
        let Transition { next, effects } = transition(previous, event);
        inner.machine = next;

        let ticket = inner.current;
        let released = if next.activation != VoiceActivationState::Listening {
            inner.lease.take()
        } else {
            None
        };
        if !next.activation.is_capturing() {
            inner.current = None;
        }

        if next.activation != previous.activation {
            inner.entered_at = Instant::now();
            info!(
                "event=voice_transition module=voice status=ok session={} from={} to={} trigger={}",
                self.id,
                previous.activation.as_str(),
                next.activation.as_str(),
                trigger
            );
            let _ = self.state_tx.send(next.activation);
        }

        let mut abort = None;
        for effect in effects {
            match effect {
                // Opened by `activate` before the transition was committed.
                VoiceEffect::StartCapture => {}
                VoiceEffect::AbortCapture => {
                    abort = ticket.map(|ticket| PendingAbort {
                        ticket,
                        lease: None,
                    });
                }
                VoiceEffect::PublishResult(result) => {
                    info!(
                        "event=voice_result module=voice status=published session={} has_due_date={} has_priority={}",
                        self.id,
                        result.due_date.is_some(),
                        result.priority.is_some()
                    );
                    let _ = self.result_tx.send(result);
                }
                VoiceEffect::Notify(notice) => self.notify(notice),
            }
        }
        if let Some(pending) = abort.as_mut() {
            pending.lease = released;
        }
        abort
    }

    fn run_aborts(&self, aborts: impl IntoIterator<Item = PendingAbort>) {
        for PendingAbort { ticket, lease } in aborts {
            self.engine.abort_capture(ticket);
            debug!(
                "event=voice_capture module=voice status=aborted session={} ticket={} released={}",
                self.id,
                ticket,
                lease.is_some()
            );
            drop(lease);
        }
    }

    fn notify(&self, notice: VoiceNotice) {
        info!(
            "event=voice_notice module=voice status=emitted session={} kind={}",
            self.id,
            notice.kind()
        );
        let _ = self.notice_tx.send(notice);
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let open = inner
            .current
            .filter(|_| inner.machine.activation.is_capturing());
        if let Some(ticket) = open {
            self.engine.abort_capture(ticket);
            info!(
                "event=voice_capture module=voice status=aborted stage=drop session={} ticket={}",
                self.id, ticket
            );
        }
    }
}
