//! Hook-side event intake.
//!
//! `ccmon-hook` runs once per lifecycle event: Claude Code invokes it with
//! the event kind as its argument and the event payload as JSON on stdin.
//! Input is validated strictly; anything malformed aborts the invocation
//! with a diagnostic instead of guessing at session state.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::config::Config;
use crate::notifier::{self, NotificationKind};
use crate::session::{HookEvent, HookEventName, Status};
use crate::store::SessionStore;

/// Payload fields ccmon reads from the event JSON. Claude Code sends more;
/// unknown fields are ignored, known fields with the wrong type are errors.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    notification_type: Option<String>,
}

/// Parses and validates one hook invocation into an event.
///
/// Rejects unknown event kinds, malformed JSON, and a missing or empty
/// `session_id`. A missing `cwd` falls back to this process's working
/// directory.
pub fn parse_event(event_name: &str, payload: &str, tty: Option<String>) -> Result<HookEvent> {
    let name = HookEventName::parse(event_name)
        .ok_or_else(|| anyhow!("Unknown hook event: {:?}", event_name))?;

    let raw: RawEvent = serde_json::from_str(payload).context("Failed to parse hook payload")?;

    let session_id = match raw.session_id {
        Some(id) if !id.is_empty() => id,
        Some(_) => bail!("Hook payload has an empty session_id"),
        None => bail!("Hook payload is missing session_id"),
    };

    let cwd = match raw.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir()
            .context("Failed to resolve working directory")?
            .to_string_lossy()
            .into_owned(),
    };

    Ok(HookEvent {
        name,
        session_id,
        cwd,
        tty,
        notification_type: raw.notification_type,
    })
}

/// Terminal identifier for this invocation.
///
/// The hook's parent is the Claude Code process driving the session, so
/// its pid stands in for the terminal: when it dies, the session is gone.
#[cfg(unix)]
pub fn resolve_tty() -> Option<String> {
    Some(format!("proc_{}", unsafe { libc::getppid() }))
}

#[cfg(not(unix))]
pub fn resolve_tty() -> Option<String> {
    None
}

/// Which notification, if any, an applied event should fire.
pub fn notification_for(
    event: &HookEvent,
    status: Status,
    config: &Config,
) -> Option<NotificationKind> {
    let settings = &config.notifications;
    if !settings.enabled {
        return None;
    }
    if event.name == HookEventName::Stop && settings.on_session_complete {
        return Some(NotificationKind::SessionComplete);
    }
    if status == Status::WaitingInput && settings.on_permission_prompt {
        return Some(NotificationKind::PermissionPrompt);
    }
    None
}

/// Handles one hook invocation end to end: validate, apply, notify, flush.
///
/// The write is forced to disk before returning because the process exits
/// right after. Validation failures surface as errors; persistence
/// failures do not.
pub fn run(store: &SessionStore, event_name: &str, payload: &str) -> Result<()> {
    let event = parse_event(event_name, payload, resolve_tty())?;
    let session = store.update_session(&event);

    let config = Config::load();
    if let Some(kind) = notification_for(&event, session.status, &config) {
        notifier::send(kind, &session);
    }

    store.flush();
    Ok(())
}
