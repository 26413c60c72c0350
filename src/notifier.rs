//! Desktop notifications for session state changes.
//!
//! Fire and forget: a notification that cannot be delivered is dropped.
//! The hook process must never fail or block because a notification
//! backend is missing.

use crate::session::{extract_project_name, Session};

/// The two moments worth interrupting the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A session hit a permission prompt and is waiting
    PermissionPrompt,
    /// A session finished responding
    SessionComplete,
}

impl NotificationKind {
    fn title(&self) -> &'static str {
        match self {
            NotificationKind::PermissionPrompt => "Claude Code needs your attention",
            NotificationKind::SessionComplete => "Claude Code session finished",
        }
    }
}

/// Body line for a notification about `session`.
fn message(kind: NotificationKind, session: &Session) -> String {
    let project = extract_project_name(&session.cwd);
    match kind {
        NotificationKind::PermissionPrompt => {
            format!("{} is waiting for permission", project)
        }
        NotificationKind::SessionComplete => format!("{} is done", project),
    }
}

/// Shows a desktop notification for `session`. Failures are ignored.
pub fn send(kind: NotificationKind, session: &Session) {
    deliver(kind.title(), &message(kind, session));
}

#[cfg(target_os = "macos")]
fn deliver(title: &str, body: &str) {
    use std::process::Command;

    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escape_applescript(body),
        escape_applescript(title),
    );
    let _ = Command::new("osascript").arg("-e").arg(&script).output();
}

#[cfg(all(unix, not(target_os = "macos")))]
fn deliver(title: &str, body: &str) {
    use std::process::Command;

    let _ = Command::new("notify-send")
        .arg("--app-name=ccmon")
        .arg(title)
        .arg(body)
        .output();
}

#[cfg(not(unix))]
fn deliver(_title: &str, _body: &str) {}

/// Escape a string for safe interpolation into AppleScript.
///
/// Replaces backslashes and double quotes with their escaped forms
/// to prevent AppleScript injection.
#[cfg(target_os = "macos")]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
