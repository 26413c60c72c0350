//! Installs the ccmon hook commands into Claude Code's settings.
//!
//! Reads `~/.claude/settings.json`, adds a `ccmon-hook` entry for each
//! lifecycle event ccmon tracks, and writes the file back. Settings that
//! belong to other tools are passed through untouched; a file that does
//! not parse is left alone and reported as an error rather than clobbered.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::HookEventName;

/// Returns the path of Claude Code's user-level settings file.
pub fn claude_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("settings.json")
}

/// What a setup run did, per event kind.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub added: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

/// Claude Code settings, typed just enough to edit the hooks section.
/// Everything else rides along through the flattened maps.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<HashMap<String, Vec<HookMatcher>>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<Vec<HookCommand>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookCommand {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    command_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Installs the hook entries into the default settings file.
pub fn install_hooks() -> Result<SetupReport> {
    install_hooks_at(&claude_settings_path())
}

/// Installs the hook entries into an explicit settings file.
///
/// Events already wired to ccmon are skipped; the file is only rewritten
/// when something was added.
pub fn install_hooks_at(path: &Path) -> Result<SetupReport> {
    let mut settings = read_settings(path)?;
    let report = add_missing_hooks(&mut settings);
    if !report.added.is_empty() {
        write_settings(path, &settings)?;
    }
    Ok(report)
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| {
        format!(
            "Failed to parse {}; fix the JSON syntax or remove the file and retry",
            path.display()
        )
    })
}

fn add_missing_hooks(settings: &mut SettingsFile) -> SetupReport {
    let mut report = SetupReport::default();
    let hooks = settings.hooks.get_or_insert_with(HashMap::new);

    for event in HookEventName::ALL {
        let matchers = hooks.entry(event.as_str().to_string()).or_default();
        if matchers.iter().any(runs_ccmon) {
            report.skipped.push(event.as_str());
        } else {
            matchers.push(ccmon_entry(event));
            report.added.push(event.as_str());
        }
    }
    report
}

/// True when an existing entry already invokes the ccmon hook.
fn runs_ccmon(matcher: &HookMatcher) -> bool {
    matcher
        .hooks
        .as_ref()
        .map(|hooks| {
            hooks.iter().any(|hook| {
                hook.command
                    .as_deref()
                    .map(|command| command.contains("ccmon-hook"))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

fn ccmon_entry(event: HookEventName) -> HookMatcher {
    // Tool and notification events take a match-everything matcher;
    // UserPromptSubmit has nothing to match on.
    let matcher = if event == HookEventName::UserPromptSubmit {
        None
    } else {
        Some(String::new())
    };

    HookMatcher {
        matcher,
        hooks: Some(vec![HookCommand {
            command_type: Some("command".to_string()),
            command: Some(format!("ccmon-hook {}", event.as_str())),
            other: HashMap::new(),
        }]),
        other: HashMap::new(),
    }
}

/// Writes the settings atomically (temp file + rename).
fn write_settings(path: &Path, settings: &SettingsFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, &json)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;

    Ok(())
}
