//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose goal dialog, goal list and voice quick-capture use cases to Dart
//!   via FRB.
//! - Host the process-wide voice session the Dart shell drives.
//! - Translate core errors into response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every DB-backed call opens the configured database, so settings changes
//!   are picked up on the next call.
//! - `goal_save` never persists an over-limit active goal without an explicit
//!   `confirmed = Some(true)`.
//! - A voice todo is created only for a result the session accepted under the
//!   current ticket.

use chrono::NaiveDate;
use log::{debug, warn};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use uuid::Uuid;
use wellnest_core::db::open_db;
use wellnest_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ActivationOutcome, CapacityPolicy, ConfirmationPrompt, CoreConfig, EngineFailure, Goal,
    GoalDraft, GoalListQuery, GoalService, GoalStatus, OverLimitConfirmation, PresetAnswer,
    SaveOutcome, SessionTicket, SpeechEngine, SqliteGoalRepository, SqliteSettingsRepository,
    SqliteTodoRepository, SurfaceKind, TodoService, UndoToken, VoiceActivationState,
    VoiceCaptureResult, VoiceSession, VoiceSurface,
};

const DB_FILE_NAME: &str = "wellnest.sqlite3";
const DB_PATH_ENV: &str = "WELLNEST_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static VOICE: OnceLock<VoiceBridge> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One option in the goal status selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalStatusOption {
    /// `active|backlog|completed`.
    pub status: String,
    pub enabled: bool,
}

/// Render-time status selector for the add/edit goal dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalStatusPickerResponse {
    pub ok: bool,
    pub options: Vec<GoalStatusOption>,
    /// Selection to display after policy coercion.
    pub selected: String,
    pub caption: String,
    /// Whether the caption should use warning styling.
    pub warning: bool,
    pub active_count: u32,
    pub limit: u32,
    pub message: String,
}

impl GoalStatusPickerResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            options: Vec::new(),
            selected: String::new(),
            caption: String::new(),
            warning: false,
            active_count: 0,
            limit: 0,
            message: message.into(),
        }
    }
}

/// Save result for the goal dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalSaveResponse {
    pub ok: bool,
    /// `saved|needs_confirmation|cancelled|error`.
    pub outcome: String,
    pub goal_id: Option<String>,
    /// Status actually stored; may differ from the request under hard limits.
    pub stored_status: Option<String>,
    /// Confirmation text to show when `outcome == needs_confirmation`.
    pub confirmation_message: Option<String>,
    pub message: String,
}

impl GoalSaveResponse {
    fn saved(goal: &Goal) -> Self {
        Self {
            ok: true,
            outcome: "saved".to_string(),
            goal_id: Some(goal.id.to_string()),
            stored_status: Some(goal.status.as_str().to_string()),
            confirmation_message: None,
            message: "Goal saved.".to_string(),
        }
    }

    fn needs_confirmation(request: OverLimitConfirmation) -> Self {
        Self {
            ok: true,
            outcome: "needs_confirmation".to_string(),
            goal_id: None,
            stored_status: None,
            confirmation_message: Some(request.message),
            message: "Confirmation required.".to_string(),
        }
    }

    fn cancelled() -> Self {
        Self {
            ok: true,
            outcome: "cancelled".to_string(),
            goal_id: None,
            stored_status: None,
            confirmation_message: None,
            message: "Save cancelled.".to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            outcome: "error".to_string(),
            goal_id: None,
            stored_status: None,
            confirmation_message: None,
            message: message.into(),
        }
    }
}

/// Goal row for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalItem {
    pub goal_id: String,
    pub title: String,
    pub status: String,
    pub category: String,
    /// `YYYY-MM-DD`.
    pub target_date: Option<String>,
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalListResponse {
    pub ok: bool,
    pub items: Vec<GoalItem>,
    pub active_count: u32,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Affected record id, when there is one.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Result of committing a voice capture as a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCommitResponse {
    pub ok: bool,
    /// Created todo id; pass to `todo_undo` for the undo action.
    pub todo_id: Option<String>,
    pub title: Option<String>,
    /// Session state after the delivery.
    pub state: String,
    pub message: String,
}

impl VoiceCommitResponse {
    fn failure(state: VoiceActivationState, message: String) -> Self {
        Self {
            ok: false,
            todo_id: None,
            title: None,
            state: state.as_str().to_string(),
            message,
        }
    }
}

/// One-shot voice notice for a toast or inline hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceNoticeItem {
    /// `permission_denied|unavailable|no_speech|microphone_busy|engine_failed|timed_out`.
    pub kind: String,
    pub message: String,
}

/// Voice session snapshot returned by every voice call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateResponse {
    pub ok: bool,
    /// What the call did. Activation: `started|cancelled|ignored|permission_denied|
    /// unavailable|microphone_busy|failed`; ticketed callbacks: `accepted|stale`;
    /// `voice_state`: `ok|timed_out`; everything else: `ok`.
    pub outcome: String,
    /// `idle|ready|listening|processing|error`.
    pub state: String,
    /// Ticket of the in-flight capture; engine callbacks must carry it.
    pub ticket: Option<u64>,
    /// Whether the platform recognizer should be running right now.
    pub listening: bool,
    /// Notices raised since the previous voice call.
    pub notices: Vec<VoiceNoticeItem>,
}

/// Builds the status selector for the goal dialog.
///
/// `goal_id` is `None` for the add dialog. `selection` is the current pick.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Reads the active-goal count at call time.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_status_picker(goal_id: Option<String>, selection: String) -> GoalStatusPickerResponse {
    let result = (|| -> Result<GoalStatusPickerResponse, String> {
        let editing = goal_id.as_deref().map(parse_id).transpose()?;
        let selection = parse_status(&selection)?;
        with_goal_service(|service| {
            let picker = service
                .status_picker(editing, selection)
                .map_err(|err| err.to_string())?;
            Ok(GoalStatusPickerResponse {
                ok: true,
                options: picker
                    .options
                    .iter()
                    .map(|option| GoalStatusOption {
                        status: option.status.as_str().to_string(),
                        enabled: option.enabled,
                    })
                    .collect(),
                selected: picker.selected.as_str().to_string(),
                caption: picker.caption,
                warning: picker.tone == wellnest_core::policy::capacity::CaptionTone::Warning,
                active_count: picker.active_count,
                limit: picker.limit,
                message: String::new(),
            })
        })
    })();

    result.unwrap_or_else(|err| {
        GoalStatusPickerResponse::failure(log_failure("goal_status_picker", err))
    })
}

/// Saves the goal dialog.
///
/// Two-phase confirmation:
/// - `confirmed = None`: if the save needs the over-limit confirmation,
///   nothing is written and `needs_confirmation` is returned with the text.
/// - `confirmed = Some(answer)`: the answer is applied to that confirmation.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Re-reads the active count at commit time.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_save(
    goal_id: Option<String>,
    title: String,
    category: String,
    target_date: Option<String>,
    status: String,
    confirmed: Option<bool>,
) -> GoalSaveResponse {
    let result = (|| -> Result<GoalSaveResponse, String> {
        let draft = GoalDraft {
            id: goal_id.as_deref().map(parse_id).transpose()?,
            title: title.trim().to_string(),
            category: category.trim().to_string(),
            target_date: target_date.as_deref().map(parse_date).transpose()?,
            status: parse_status(&status)?,
        };

        with_goal_service(|service| match confirmed {
            Some(answer) => {
                let outcome = service
                    .save_goal(&draft, &mut PresetAnswer(answer))
                    .map_err(|err| err.to_string())?;
                Ok(match outcome {
                    SaveOutcome::Saved(goal) => GoalSaveResponse::saved(&goal),
                    SaveOutcome::Cancelled => GoalSaveResponse::cancelled(),
                })
            }
            None => {
                let mut prompt = DeferredPrompt::default();
                let outcome = service
                    .save_goal(&draft, &mut prompt)
                    .map_err(|err| err.to_string())?;
                Ok(match (outcome, prompt.pending) {
                    (SaveOutcome::Saved(goal), _) => GoalSaveResponse::saved(&goal),
                    (SaveOutcome::Cancelled, Some(request)) => {
                        GoalSaveResponse::needs_confirmation(request)
                    }
                    (SaveOutcome::Cancelled, None) => GoalSaveResponse::cancelled(),
                })
            }
        })
    })();

    result.unwrap_or_else(|err| GoalSaveResponse::failure(log_failure("goal_save", err)))
}

/// Marks a goal completed.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_complete(goal_id: String) -> ActionResponse {
    let result = parse_id(&goal_id).and_then(|id| {
        with_goal_service(|service| service.complete_goal(id).map_err(|err| err.to_string()))
    });
    match result {
        Ok(goal) => ActionResponse::success("Goal completed.", goal.id.to_string()),
        Err(err) => ActionResponse::failure(log_failure("goal_complete", err)),
    }
}

/// Deletes a goal. The UI confirms before calling.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_delete(goal_id: String) -> ActionResponse {
    let result = parse_id(&goal_id).and_then(|id| {
        with_goal_service(|service| service.delete_goal(id).map_err(|err| err.to_string()))
            .map(|()| id)
    });
    match result {
        Ok(id) => ActionResponse::success("Goal deleted.", id.to_string()),
        Err(err) => ActionResponse::failure(log_failure("goal_delete", err)),
    }
}

/// Lists goals, optionally filtered by status.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_list(status: Option<String>) -> GoalListResponse {
    let result = (|| -> Result<GoalListResponse, String> {
        let query = GoalListQuery {
            status: status.as_deref().map(parse_status).transpose()?,
            ..GoalListQuery::default()
        };
        with_goal_service(|service| {
            let goals = service.list_goals(&query).map_err(|err| err.to_string())?;
            let active_count = service.count_active().map_err(|err| err.to_string())?;
            Ok(GoalListResponse {
                ok: true,
                items: goals.into_iter().map(to_goal_item).collect(),
                active_count,
                message: String::new(),
            })
        })
    })();

    result.unwrap_or_else(|err| GoalListResponse {
        ok: false,
        items: Vec::new(),
        active_count: 0,
        message: log_failure("goal_list", err),
    })
}

/// Reports what the platform speech plugin can do.
///
/// Call on startup and whenever availability or permission changes. Until
/// then the session treats speech as unavailable.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_set_engine_status(available: bool, permission_granted: bool) -> VoiceStateResponse {
    let bridge = voice_bridge();
    bridge.engine.available.store(available, Ordering::SeqCst);
    bridge
        .engine
        .permission_granted
        .store(permission_granted, Ordering::SeqCst);
    bridge.respond("ok")
}

/// Mic button, overlay voice button or shake.
///
/// On `started`, open the platform recognizer and tag every callback with
/// the returned `ticket`. A second activation while listening cancels.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_activate(hint: Option<String>) -> VoiceStateResponse {
    let bridge = voice_bridge();
    bridge.session.expire_now();
    let outcome = bridge.session.activate(hint.as_deref());
    bridge.respond(activation_label(outcome))
}

/// Tap-to-cancel or overlay dismissal.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_cancel() -> VoiceStateResponse {
    let bridge = voice_bridge();
    bridge.session.expire_now();
    bridge.session.cancel();
    bridge.respond("ok")
}

#[flutter_rust_bridge::frb(sync)]
pub fn voice_acknowledge_error() -> VoiceStateResponse {
    let bridge = voice_bridge();
    bridge.session.acknowledge_error();
    bridge.respond("ok")
}

/// Current session state. Also applies listening/processing/error deadlines,
/// so the shell polls this while a capture is in flight.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_state() -> VoiceStateResponse {
    let bridge = voice_bridge();
    let expired = bridge.session.expire_now();
    bridge.respond(if expired { "timed_out" } else { "ok" })
}

/// Recognizer callback: the speaker stopped talking.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_end_of_utterance(ticket: u64) -> VoiceStateResponse {
    let bridge = voice_bridge();
    bridge.session.expire_now();
    let accepted = bridge.session.end_of_utterance(SessionTicket(ticket));
    bridge.respond(callback_label(accepted))
}

/// Recognizer callback: capture failed.
///
/// `kind` is `no_speech`, `permission_revoked` or anything else for a
/// generic failure described by `message`.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_report_failure(ticket: u64, kind: String, message: String) -> VoiceStateResponse {
    let failure = match kind.trim() {
        "no_speech" => EngineFailure::NoSpeech,
        "permission_revoked" => EngineFailure::PermissionRevoked,
        _ => EngineFailure::Other(message),
    };
    let bridge = voice_bridge();
    bridge.session.expire_now();
    let accepted = bridge.session.report_failure(SessionTicket(ticket), failure);
    bridge.respond(callback_label(accepted))
}

/// Recognizer callback: the semantic parse finished. Creates the todo.
///
/// `payload_json` is the `{title, dueDate?, priority?}` object produced by
/// the semantic parser.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - A stale `ticket` (cancelled, timed out or superseded) creates nothing.
/// - Exactly one todo is created per accepted result.
#[flutter_rust_bridge::frb(sync)]
pub fn voice_deliver(ticket: u64, payload_json: String) -> VoiceCommitResponse {
    let bridge = voice_bridge();
    bridge.session.expire_now();

    let mut surface = bridge.lock_surface();
    // Anything still queued was published before this call and is not ours.
    surface.drain_results();
    let parsed = VoiceCaptureResult::from_json_str(&payload_json);
    let parse_error = parsed.as_ref().err().map(ToString::to_string);
    if !bridge.session.deliver_result(SessionTicket(ticket), parsed) {
        return VoiceCommitResponse::failure(
            bridge.session.state(),
            log_failure("voice_deliver", format!("ticket {ticket} is no longer current")),
        );
    }
    let published = surface.drain_results().pop();
    drop(surface);

    let state = bridge.session.state();
    let Some(capture) = published else {
        let reason = parse_error.unwrap_or_else(|| "no result was published".to_string());
        return VoiceCommitResponse::failure(state, log_failure("voice_deliver", reason));
    };

    let created = with_connection(|conn| {
        let repo = SqliteTodoRepository::try_new(conn).map_err(|err| err.to_string())?;
        TodoService::new(repo)
            .create_from_capture(&capture)
            .map_err(|err| err.to_string())
    });
    match created {
        Ok(captured) => VoiceCommitResponse {
            ok: true,
            todo_id: Some(captured.undo.todo_id().to_string()),
            title: Some(captured.todo.title),
            state: state.as_str().to_string(),
            message: "Todo created.".to_string(),
        },
        Err(err) => VoiceCommitResponse::failure(state, log_failure("voice_deliver", err)),
    }
}

/// Undoes a voice-created todo by id.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_undo(todo_id: String) -> ActionResponse {
    let result = parse_id(&todo_id).and_then(|id| {
        with_connection(|conn| {
            let repo = SqliteTodoRepository::try_new(conn).map_err(|err| err.to_string())?;
            TodoService::new(repo)
                .undo(UndoToken::from_todo_id(id))
                .map_err(|err| err.to_string())
        })
        .map(|()| id)
    });
    match result {
        Ok(id) => ActionResponse::success("Todo removed.", id.to_string()),
        Err(err) => ActionResponse::failure(log_failure("todo_undo", err)),
    }
}

/// Prompt that defers the question to a second FFI call.
#[derive(Default)]
struct DeferredPrompt {
    pending: Option<OverLimitConfirmation>,
}

impl ConfirmationPrompt for DeferredPrompt {
    fn confirm_over_limit(&mut self, request: &OverLimitConfirmation) -> bool {
        self.pending = Some(request.clone());
        false
    }
}

/// Speech engine whose recognizer lives in the Dart shell.
///
/// Dart reports availability and permission, opens the recognizer when an
/// activation returns `started` and closes it once `listening` goes false.
#[derive(Default)]
struct ShellEngine {
    available: AtomicBool,
    permission_granted: AtomicBool,
}

impl SpeechEngine for ShellEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn has_permission(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    // The shell asks the OS itself and reports the answer through
    // `voice_set_engine_status`.
    fn request_permission(&self) -> bool {
        self.has_permission()
    }

    fn start_capture(&self, ticket: SessionTicket, hint: Option<&str>) -> Result<(), EngineFailure> {
        debug!(
            "event=voice_capture module=ffi status=start ticket={ticket} has_hint={}",
            hint.is_some()
        );
        Ok(())
    }

    fn abort_capture(&self, ticket: SessionTicket) {
        debug!("event=voice_capture module=ffi status=abort ticket={ticket}");
    }
}

struct VoiceBridge {
    engine: Arc<ShellEngine>,
    session: Arc<VoiceSession>,
    surface: Mutex<VoiceSurface>,
}

impl VoiceBridge {
    fn lock_surface(&self) -> MutexGuard<'_, VoiceSurface> {
        self.surface
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, outcome: &str) -> VoiceStateResponse {
        let mut surface = self.lock_surface();
        surface.drain_states();
        let notices = surface
            .drain_notices()
            .into_iter()
            .map(|notice| VoiceNoticeItem {
                kind: notice.kind().to_string(),
                message: notice.message(),
            })
            .collect();
        drop(surface);

        let state = self.session.state();
        VoiceStateResponse {
            ok: true,
            outcome: outcome.to_string(),
            state: state.as_str().to_string(),
            ticket: self.session.current_ticket().map(|ticket| ticket.0),
            listening: state == VoiceActivationState::Listening,
            notices,
        }
    }
}

fn voice_bridge() -> &'static VoiceBridge {
    VOICE.get_or_init(|| {
        let config = with_connection(load_config).unwrap_or_else(|err| {
            warn!("event=ffi_call module=ffi status=fallback call=voice_init error={err}");
            CoreConfig::default()
        });
        let engine = Arc::new(ShellEngine::default());
        let session = VoiceSession::new(engine.clone(), config.voice);
        let surface = VoiceSurface::attach(SurfaceKind::Overlay, session.clone());
        VoiceBridge {
            engine,
            session,
            surface: Mutex::new(surface),
        }
    })
}

fn activation_label(outcome: ActivationOutcome) -> &'static str {
    match outcome {
        ActivationOutcome::Started(_) => "started",
        ActivationOutcome::Cancelled => "cancelled",
        ActivationOutcome::Ignored => "ignored",
        ActivationOutcome::PermissionDenied => "permission_denied",
        ActivationOutcome::Unavailable => "unavailable",
        ActivationOutcome::MicrophoneBusy => "microphone_busy",
        ActivationOutcome::Failed => "failed",
    }
}

fn callback_label(accepted: bool) -> &'static str {
    if accepted {
        "accepted"
    } else {
        "stale"
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_connection<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let conn =
        open_db(resolve_db_path()).map_err(|err| format!("database open failed: {err}"))?;
    f(&conn)
}

fn with_goal_service<T>(
    f: impl FnOnce(&GoalService<SqliteGoalRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    with_connection(|conn| {
        let policy = load_policy(conn)?;
        let repo = SqliteGoalRepository::try_new(conn)
            .map_err(|err| format!("goal repo init failed: {err}"))?;
        f(&GoalService::new(repo, policy))
    })
}

fn load_config(conn: &Connection) -> Result<CoreConfig, String> {
    let settings = SqliteSettingsRepository::try_new(conn)
        .map_err(|err| format!("settings repo init failed: {err}"))?;
    CoreConfig::load(&settings).map_err(|err| format!("config load failed: {err}"))
}

fn load_policy(conn: &Connection) -> Result<CapacityPolicy, String> {
    load_config(conn)?
        .capacity_policy()
        .map_err(|err| format!("config load failed: {err}"))
}

fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid id `{raw}`: {err}"))
}

fn parse_status(raw: &str) -> Result<GoalStatus, String> {
    GoalStatus::parse(raw.trim()).ok_or_else(|| format!("invalid goal status `{raw}`"))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid target date `{raw}`: {err}"))
}

fn to_goal_item(goal: Goal) -> GoalItem {
    GoalItem {
        goal_id: goal.id.to_string(),
        title: goal.title,
        status: goal.status.as_str().to_string(),
        category: goal.category,
        target_date: goal
            .target_date
            .map(|date| date.format("%Y-%m-%d").to_string()),
        progress: goal.progress,
    }
}

fn log_failure(call: &str, err: String) -> String {
    warn!("event=ffi_call module=ffi status=error call={call}");
    format!("{call} failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, goal_complete, goal_delete, goal_list, goal_save, goal_status_picker,
        init_logging, ping, todo_undo, voice_acknowledge_error, voice_activate, voice_cancel,
        voice_deliver, voice_end_of_utterance, voice_set_engine_status, voice_state,
        VoiceStateResponse,
    };
    use std::sync::{Mutex, MutexGuard};

    // The voice session is process-wide; voice tests take turns.
    static VOICE_TURN: Mutex<()> = Mutex::new(());

    fn voice_at_rest() -> MutexGuard<'static, ()> {
        let turn = VOICE_TURN
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        voice_set_engine_status(true, true);
        voice_cancel();
        voice_acknowledge_error();
        voice_state();
        turn
    }

    fn started_ticket(response: &VoiceStateResponse) -> u64 {
        assert_eq!(response.outcome, "started", "{response:?}");
        assert!(response.listening);
        response.ticket.expect("ticket while listening")
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    fn save_active(title: &str, confirmed: Option<bool>) -> super::GoalSaveResponse {
        goal_save(
            None,
            title.to_string(),
            "focus".to_string(),
            Some("2026-12-31".to_string()),
            "active".to_string(),
            confirmed,
        )
    }

    #[test]
    fn goal_save_asks_before_exceeding_soft_limit() {
        // Guarantee the default limit is reached regardless of other tests.
        for title in ["seed one", "seed two"] {
            let seeded = save_active(title, Some(true));
            assert!(seeded.ok, "{}", seeded.message);
        }

        let pending = save_active("one more", None);
        assert!(pending.ok, "{}", pending.message);
        assert_eq!(pending.outcome, "needs_confirmation");
        assert!(pending.goal_id.is_none());
        assert!(pending
            .confirmation_message
            .as_deref()
            .is_some_and(|text| text.contains("active goals")));

        let declined = save_active("one more", Some(false));
        assert_eq!(declined.outcome, "cancelled");

        let accepted = save_active("one more", Some(true));
        assert_eq!(accepted.outcome, "saved");
        assert_eq!(accepted.stored_status.as_deref(), Some("active"));
    }

    #[test]
    fn goal_save_rejects_bad_input() {
        let response = goal_save(
            None,
            "title".to_string(),
            "cat".to_string(),
            None,
            "paused".to_string(),
            None,
        );
        assert!(!response.ok);
        assert_eq!(response.outcome, "error");
        assert!(response.message.contains("paused"));

        let response = goal_save(
            None,
            "title".to_string(),
            "cat".to_string(),
            Some("31/12/2026".to_string()),
            "backlog".to_string(),
            None,
        );
        assert!(!response.ok);
    }

    #[test]
    fn status_picker_lists_all_statuses() {
        let picker = goal_status_picker(None, "backlog".to_string());
        assert!(picker.ok, "{}", picker.message);
        let statuses: Vec<_> = picker.options.iter().map(|o| o.status.as_str()).collect();
        assert_eq!(statuses, vec!["active", "backlog", "completed"]);
        assert_eq!(picker.selected, "backlog");
        assert!(picker.limit >= 1);
    }

    #[test]
    fn complete_and_delete_goal_roundtrip() {
        let saved = goal_save(
            None,
            "finish course".to_string(),
            "growth".to_string(),
            None,
            "backlog".to_string(),
            None,
        );
        assert!(saved.ok, "{}", saved.message);
        let goal_id = saved.goal_id.expect("saved goal id");

        let completed = goal_complete(goal_id.clone());
        assert!(completed.ok, "{}", completed.message);

        let listed = goal_list(Some("completed".to_string()));
        assert!(listed.ok, "{}", listed.message);
        let item = listed
            .items
            .iter()
            .find(|item| item.goal_id == goal_id)
            .expect("completed goal listed");
        assert_eq!(item.progress, 100);

        assert!(goal_delete(goal_id.clone()).ok);
        assert!(!goal_delete(goal_id).ok);
    }

    #[test]
    fn voice_deliver_for_current_ticket_creates_todo_then_undo_removes_it() {
        let _turn = voice_at_rest();
        let ticket = started_ticket(&voice_activate(Some("errands".to_string())));

        let committed = voice_deliver(
            ticket,
            r#"{"title":"call mom","priority":"high"}"#.to_string(),
        );
        assert!(committed.ok, "{}", committed.message);
        assert_eq!(committed.title.as_deref(), Some("call mom"));
        assert_eq!(committed.state, "idle");
        let todo_id = committed.todo_id.expect("created todo id");

        assert!(todo_undo(todo_id.clone()).ok);
        assert!(!todo_undo(todo_id).ok);
    }

    #[test]
    fn voice_deliver_after_cancel_creates_nothing() {
        let _turn = voice_at_rest();
        let ticket = started_ticket(&voice_activate(None));

        let cancelled = voice_cancel();
        assert_eq!(cancelled.state, "idle");
        assert!(!cancelled.listening);
        assert_eq!(cancelled.ticket, None);

        let late = voice_deliver(ticket, r#"{"title":"too late"}"#.to_string());
        assert!(!late.ok);
        assert!(late.todo_id.is_none());
        assert!(late.message.contains("no longer current"), "{}", late.message);
        assert_eq!(voice_end_of_utterance(ticket).outcome, "stale");
    }

    #[test]
    fn voice_deliver_with_superseded_ticket_creates_nothing() {
        let _turn = voice_at_rest();
        let first = started_ticket(&voice_activate(None));
        assert_eq!(voice_activate(None).outcome, "cancelled");
        let second = started_ticket(&voice_activate(None));
        assert_ne!(first, second);

        assert!(!voice_deliver(first, r#"{"title":"old"}"#.to_string()).ok);
        assert_eq!(voice_state().state, "listening");

        let processing = voice_end_of_utterance(second);
        assert_eq!(processing.outcome, "accepted");
        assert_eq!(processing.state, "processing");
        assert!(!processing.listening);
        let committed = voice_deliver(second, r#"{"title":"new"}"#.to_string());
        assert!(committed.ok, "{}", committed.message);
        assert!(todo_undo(committed.todo_id.expect("todo id")).ok);
    }

    #[test]
    fn voice_activation_without_permission_is_a_notice() {
        let _turn = voice_at_rest();
        voice_set_engine_status(true, false);

        let denied = voice_activate(None);
        assert_eq!(denied.outcome, "permission_denied");
        assert_eq!(denied.state, "idle");
        assert_eq!(denied.ticket, None);
        let kinds: Vec<_> = denied.notices.iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["permission_denied"]);

        voice_set_engine_status(true, true);
    }

    #[test]
    fn voice_deliver_without_title_counts_as_no_speech() {
        let _turn = voice_at_rest();
        let ticket = started_ticket(&voice_activate(None));

        let committed = voice_deliver(ticket, r#"{"priority":"low"}"#.to_string());
        assert!(!committed.ok);
        assert!(committed.todo_id.is_none());
        assert_eq!(committed.state, "idle");

        let after = voice_state();
        assert!(after.notices.iter().any(|notice| notice.kind == "no_speech"));
    }
}
