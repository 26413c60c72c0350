//! End-to-end integration tests for the ccmon-hook binary.
//!
//! These tests verify that the hook binary correctly processes stdin JSON
//! and updates the shared session snapshot.
//!
//! Each test gets its own isolated state directory via the `CCMON_DIR`
//! env var, so tests run safely in parallel without interfering with each
//! other or real user data.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tempfile::TempDir;

/// Session struct for deserializing JSON (simplified version for tests)
#[derive(Debug, Deserialize)]
struct TestSession {
    session_id: String,
    cwd: String,
    #[serde(default)]
    tty: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

/// The snapshot file: all sessions plus a write timestamp.
#[derive(Debug, Deserialize)]
struct TestStore {
    sessions: HashMap<String, TestSession>,
    #[allow(dead_code)]
    updated_at: String,
}

/// Isolated test environment. Each test gets its own temp state directory.
/// The directory is automatically cleaned up when TestEnv is dropped.
struct TestEnv {
    _temp_dir: TempDir,
    base_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_dir,
        }
    }

    fn run_hook(&self, event: &str, json_input: &str) -> std::process::Output {
        let binary = hook_binary();
        assert!(
            binary.exists(),
            "Hook binary not found at {:?}. Run `cargo build` first.",
            binary
        );

        let mut child = Command::new(&binary)
            .arg(event)
            .env("CCMON_DIR", &self.base_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn hook binary");

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(json_input.as_bytes())
                .expect("Failed to write to stdin");
        }

        child.wait_with_output().expect("Failed to wait for hook")
    }

    fn store_path(&self) -> PathBuf {
        self.base_dir.join("sessions.json")
    }

    fn load_store(&self) -> TestStore {
        let content = fs::read_to_string(self.store_path()).expect("Failed to read store file");
        serde_json::from_str(&content).expect("Failed to parse store JSON")
    }

    fn load_session(&self, session_id: &str) -> TestSession {
        let mut store = self.load_store();
        store
            .sessions
            .remove(session_id)
            .unwrap_or_else(|| panic!("Session {} not found in store", session_id))
    }
}

/// Returns the path to the ccmon-hook binary.
fn hook_binary() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_ccmon-hook") {
        return PathBuf::from(path);
    }

    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("target");
    path.push("debug");
    path.push("ccmon-hook");
    path
}

#[test]
fn test_hook_binary_first_event_creates_session() {
    let env = TestEnv::new();
    let session_id = "test-first-event";

    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp/my-project","transcript_path":"~/.claude/transcript","permission_mode":"default","hook_event_name":"PreToolUse","tool_name":"Bash"}}"#,
        session_id
    );

    let output = env.run_hook("PreToolUse", &json);
    assert!(output.status.success());

    let store = env.load_store();
    assert_eq!(store.sessions.len(), 1);

    let session = env.load_session(session_id);
    assert_eq!(session.session_id, session_id);
    assert_eq!(session.cwd, "/tmp/my-project");
    assert_eq!(session.status, "running");
    assert_eq!(session.created_at, session.updated_at);

    // On Unix the hook records its parent process as the terminal identifier
    #[cfg(unix)]
    {
        let tty = session.tty.as_deref().expect("tty should be recorded");
        assert!(tty.starts_with("proc_"), "unexpected tty: {}", tty);
    }
}

#[test]
fn test_hook_binary_status_transitions() {
    let env = TestEnv::new();
    let session_id = "test-status-transitions";

    // UserPromptSubmit -> running
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"UserPromptSubmit","prompt":"test"}}"#,
        session_id
    );
    env.run_hook("UserPromptSubmit", &json);
    let session = env.load_session(session_id);
    assert_eq!(
        session.status, "running",
        "UserPromptSubmit should set running"
    );

    // Notification (permission_prompt) -> waiting_input
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"Notification","notification_type":"permission_prompt"}}"#,
        session_id
    );
    env.run_hook("Notification", &json);
    let session = env.load_session(session_id);
    assert_eq!(
        session.status, "waiting_input",
        "Notification with permission_prompt should set waiting_input"
    );

    // PostToolUse -> running (the prompt was answered)
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"PostToolUse","tool_name":"Bash"}}"#,
        session_id
    );
    env.run_hook("PostToolUse", &json);
    let session = env.load_session(session_id);
    assert_eq!(session.status, "running", "PostToolUse should set running");

    // Stop -> stopped
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"Stop"}}"#,
        session_id
    );
    env.run_hook("Stop", &json);
    let session = env.load_session(session_id);
    assert_eq!(session.status, "stopped", "Stop should set stopped");

    // Tool activity after Stop keeps the session stopped
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"PreToolUse","tool_name":"Bash"}}"#,
        session_id
    );
    env.run_hook("PreToolUse", &json);
    let session = env.load_session(session_id);
    assert_eq!(
        session.status, "stopped",
        "PreToolUse after Stop should stay stopped"
    );

    // A new prompt resumes the session
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"UserPromptSubmit","prompt":"more"}}"#,
        session_id
    );
    env.run_hook("UserPromptSubmit", &json);
    let session = env.load_session(session_id);
    assert_eq!(
        session.status, "running",
        "UserPromptSubmit should resume a stopped session"
    );
}

#[test]
fn test_hook_binary_preserves_created_at() {
    let env = TestEnv::new();
    let session_id = "test-created-at";

    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"UserPromptSubmit"}}"#,
        session_id
    );
    env.run_hook("UserPromptSubmit", &json);

    let session1 = env.load_session(session_id);
    let original_created_at = session1.created_at.clone();

    // Update session
    std::thread::sleep(std::time::Duration::from_millis(100));
    let json = format!(
        r#"{{"session_id":"{}","cwd":"/tmp","hook_event_name":"PreToolUse","tool_name":"Bash"}}"#,
        session_id
    );
    env.run_hook("PreToolUse", &json);

    let session2 = env.load_session(session_id);

    assert_eq!(
        session2.created_at, original_created_at,
        "created_at should be preserved across updates"
    );

    assert_ne!(
        session2.updated_at, original_created_at,
        "updated_at should be refreshed"
    );
}

#[test]
fn test_hook_binary_cwd_defaults_to_hook_process() {
    let env = TestEnv::new();
    let session_id = "test-default-cwd";

    let json = format!(
        r#"{{"session_id":"{}","hook_event_name":"UserPromptSubmit"}}"#,
        session_id
    );
    let output = env.run_hook("UserPromptSubmit", &json);
    assert!(output.status.success());

    // The spawned hook inherits this test's working directory
    let expected = std::env::current_dir()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    let session = env.load_session(session_id);
    assert_eq!(session.cwd, expected);
}

#[cfg(unix)]
#[test]
fn test_hook_binary_terminal_takeover() {
    let env = TestEnv::new();

    // Both hook invocations run under the same parent process, so both
    // sessions report the same terminal. The second claims it.
    let json = r#"{"session_id":"takeover-first","cwd":"/tmp","hook_event_name":"UserPromptSubmit"}"#;
    env.run_hook("UserPromptSubmit", json);

    let json = r#"{"session_id":"takeover-second","cwd":"/tmp","hook_event_name":"UserPromptSubmit"}"#;
    env.run_hook("UserPromptSubmit", json);

    let store = env.load_store();
    assert!(!store.sessions.contains_key("takeover-first"));
    assert!(store.sessions.contains_key("takeover-second"));
}

#[test]
fn test_hook_binary_unknown_event_rejected() {
    let env = TestEnv::new();

    let json = r#"{"session_id":"abc123","cwd":"/tmp","hook_event_name":"SessionStart"}"#;
    let output = env.run_hook("SessionStart", json);

    assert!(!output.status.success(), "unknown event kinds are rejected");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown hook event"), "stderr: {}", stderr);
    assert!(
        !env.store_path().exists(),
        "a rejected event must not touch the store"
    );
}

#[test]
fn test_hook_binary_invalid_json_rejected() {
    let env = TestEnv::new();

    let output = env.run_hook("PreToolUse", "not valid json");
    assert!(!output.status.success());
    assert!(!env.store_path().exists());
}

#[test]
fn test_hook_binary_missing_session_id_rejected() {
    let env = TestEnv::new();

    let output = env.run_hook("PreToolUse", r#"{"cwd":"/tmp"}"#);
    assert!(!output.status.success());

    let output = env.run_hook("PreToolUse", r#"{"session_id":"","cwd":"/tmp"}"#);
    assert!(!output.status.success());
    assert!(!env.store_path().exists());
}

#[test]
fn test_hook_binary_wrong_typed_field_rejected() {
    let env = TestEnv::new();

    let output = env.run_hook("PreToolUse", r#"{"session_id":"abc123","cwd":123}"#);
    assert!(!output.status.success());

    let output = env.run_hook(
        "Notification",
        r#"{"session_id":"abc123","notification_type":{}}"#,
    );
    assert!(!output.status.success());
}

#[test]
fn test_hook_binary_rejected_event_leaves_store_unchanged() {
    let env = TestEnv::new();

    let json = r#"{"session_id":"abc123","cwd":"/tmp","hook_event_name":"Stop"}"#;
    env.run_hook("Stop", json);
    let before = fs::read_to_string(env.store_path()).unwrap();

    let output = env.run_hook("PreToolUse", "garbage");
    assert!(!output.status.success());

    let after = fs::read_to_string(env.store_path()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_hook_binary_empty_stdin_rejected() {
    let env = TestEnv::new();

    let output = env.run_hook("PreToolUse", "");
    assert!(!output.status.success());
    assert!(!env.store_path().exists());
}

#[test]
fn test_hook_binary_missing_event_arg() {
    let binary = hook_binary();

    // No arguments; doesn't need TestEnv since it never writes files
    let output = Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to run hook");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
}

#[test]
fn test_hook_binary_version_flag() {
    let binary = hook_binary();

    let output = Command::new(&binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to run hook");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ccmon-hook "));
}
