//! Session data model for ccmon.
//!
//! Defines the Session record tracked for each Claude Code session, the
//! hook event types that drive it, and the status transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Live status of a Claude Code session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Session is actively processing (running tools, generating output)
    Running,
    /// Session is blocked on a permission prompt
    WaitingInput,
    /// Session has finished responding
    Stopped,
}

impl Status {
    /// Returns the visual indicator character for this status.
    pub fn indicator(&self) -> &'static str {
        match self {
            Status::Running => "\u{25C9}",      // *
            Status::WaitingInput => "\u{2192}", // ->
            Status::Stopped => "\u{00B7}",      // .
        }
    }

    /// Returns the human-readable label shown in list and dashboard output.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::WaitingInput => "waiting for input",
            Status::Stopped => "stopped",
        }
    }
}

/// Hook event kinds the ingester accepts. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEventName {
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    UserPromptSubmit,
}

impl HookEventName {
    /// Every accepted event kind, in hook-registration order.
    pub const ALL: [HookEventName; 5] = [
        HookEventName::PreToolUse,
        HookEventName::PostToolUse,
        HookEventName::Notification,
        HookEventName::Stop,
        HookEventName::UserPromptSubmit,
    ];

    /// Parses an event kind from the name Claude Code uses for it.
    pub fn parse(name: &str) -> Option<HookEventName> {
        match name {
            "PreToolUse" => Some(HookEventName::PreToolUse),
            "PostToolUse" => Some(HookEventName::PostToolUse),
            "Notification" => Some(HookEventName::Notification),
            "Stop" => Some(HookEventName::Stop),
            "UserPromptSubmit" => Some(HookEventName::UserPromptSubmit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEventName::PreToolUse => "PreToolUse",
            HookEventName::PostToolUse => "PostToolUse",
            HookEventName::Notification => "Notification",
            HookEventName::Stop => "Stop",
            HookEventName::UserPromptSubmit => "UserPromptSubmit",
        }
    }
}

/// A validated hook event, ready to apply to the store.
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub name: HookEventName,
    pub session_id: String,
    /// Working directory reported by the event, or the ingester's own cwd
    pub cwd: String,
    /// Terminal identifier resolved at ingest time
    pub tty: Option<String>,
    /// Subtype for Notification events (e.g. "permission_prompt")
    pub notification_type: Option<String>,
}

/// Determines the next status for a session from an incoming event.
///
/// Rules, in precedence order:
/// - Stop -> stopped, from any state
/// - UserPromptSubmit -> running, even from stopped (the user resumed)
/// - a stopped session stays stopped for every other event
/// - PreToolUse -> running
/// - Notification with notification_type "permission_prompt" -> waiting_input
/// - everything else -> running
pub fn determine_status(event: &HookEvent, previous: Option<Status>) -> Status {
    match event.name {
        HookEventName::Stop => Status::Stopped,
        HookEventName::UserPromptSubmit => Status::Running,
        _ if previous == Some(Status::Stopped) => Status::Stopped,
        HookEventName::PreToolUse => Status::Running,
        HookEventName::Notification
            if event.notification_type.as_deref() == Some("permission_prompt") =>
        {
            Status::WaitingInput
        }
        _ => Status::Running,
    }
}

/// One tracked Claude Code session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier from Claude Code
    pub session_id: String,
    /// Working directory the session runs in
    pub cwd: String,
    /// Terminal identifier, when the ingester could resolve one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<String>,
    /// Current session status
    pub status: Status,
    /// Timestamp of the first event seen for this session
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent event
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a fresh session record; both timestamps start at now.
    pub fn new(session_id: String, cwd: String, tty: Option<String>, status: Status) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            cwd,
            tty,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Format a datetime as relative time (e.g., "5m ago", "2h ago", "12s ago").
pub fn format_relative_time(datetime: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(datetime);

    if duration.num_seconds() < 0 {
        return "just now".to_string();
    }

    let seconds = duration.num_seconds();
    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h ago", hours)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        format!("{}s ago", seconds)
    }
}

/// Extracts the project name from a path (last component).
pub fn extract_project_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Shortens a path for display by replacing the home prefix with `~`.
pub fn display_path(path: &str) -> String {
    shorten_home(path, dirs::home_dir().as_deref())
}

fn shorten_home(path: &str, home: Option<&Path>) -> String {
    if let Some(home) = home {
        if let Ok(rest) = Path::new(path).strip_prefix(home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.to_string()
}
