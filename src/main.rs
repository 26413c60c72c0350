//! ccmon - Claude Code Session Monitor
//!
//! A live dashboard over the sessions tracked by the ccmon hooks.

use ccmon::config::{self, Config};
use ccmon::session::{display_path, format_relative_time};
use ccmon::setup;
use ccmon::store::SessionStore;
use ccmon::tui::{init_terminal, restore_terminal, App};
use clap::{Parser, Subcommand};

/// Live status dashboard for Claude Code sessions.
#[derive(Parser)]
#[command(
    name = "ccmon",
    version,
    about,
    long_about = "\
Live status dashboard for Claude Code sessions.\n\n\
Run without arguments to launch the interactive TUI.\n\n\
Keyboard shortcuts (TUI mode):\n  \
Up/Down or k/j    Navigate sessions\n  \
r                 Refresh session list\n  \
q or Esc          Quit\n\n\
Environment variables:\n  \
CCMON_DIR         Override the state directory (default ~/.ccmon)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions as text and exit (no TUI)
    List,
    /// Remove every tracked session
    Clear,
    /// Install the ccmon hooks into Claude Code's settings
    Setup,
    /// Show or change desktop notification settings
    Notify {
        /// Turn desktop notifications on
        #[arg(long)]
        enable: bool,
        /// Turn desktop notifications off
        #[arg(long, conflicts_with = "enable")]
        disable: bool,
        /// Show the current settings (the default when no flag is given)
        #[arg(long, conflicts_with_all = ["enable", "disable"])]
        status: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => list_sessions(),
        Some(Commands::Clear) => clear_sessions(),
        Some(Commands::Setup) => run_setup(),
        Some(Commands::Notify {
            enable,
            disable,
            status,
        }) => run_notify(enable, disable, status),
        None => run_tui(),
    }
}

/// Launch the interactive dashboard.
fn run_tui() {
    let store = SessionStore::open();

    // Initialize terminal
    let mut terminal = match init_terminal() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to initialize terminal: {}", e);
            std::process::exit(1);
        }
    };

    // Create and run the app
    let mut app = App::new(store);
    let result = app.run(&mut terminal);

    // Restore terminal state before handling any errors
    if let Err(e) = restore_terminal() {
        eprintln!("Failed to restore terminal: {}", e);
    }

    // Handle any errors from the app
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// List sessions as text output (non-TUI mode).
fn list_sessions() {
    let store = SessionStore::open();
    let sessions = store.sessions();
    // Land any pruning the read pass scheduled
    store.flush();

    if sessions.is_empty() {
        println!("No active sessions");
        return;
    }

    println!("{} session(s):\n", sessions.len());

    for session in &sessions {
        println!(
            "{} {} - {} ({})",
            session.status.indicator(),
            display_path(&session.cwd),
            session.status.label(),
            format_relative_time(session.updated_at)
        );
    }
}

/// Wipe the session store.
fn clear_sessions() {
    let store = SessionStore::open();
    store.clear();
    store.flush();
    println!("Cleared all sessions");
}

/// Install the hook entries into Claude Code's settings file.
fn run_setup() {
    let report = match setup::install_hooks() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Setup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    for event in &report.added {
        println!("Added {} hook", event);
    }
    for event in &report.skipped {
        println!("{} hook already installed", event);
    }
    if !report.added.is_empty() {
        println!("\nRestart running Claude Code sessions to pick up the hooks.");
    }
}

/// Show or change notification settings.
fn run_notify(enable: bool, disable: bool, status: bool) {
    let mut config = Config::load();

    let show_only = status || !(enable || disable);
    if !show_only {
        config.notifications.enabled = enable;
        if let Err(e) = config.save() {
            eprintln!("Failed to save config: {:#}", e);
            std::process::exit(1);
        }
    }

    let settings = &config.notifications;
    println!(
        "Desktop notifications: {}",
        on_off(settings.enabled)
    );
    println!("  on permission prompt: {}", on_off(settings.on_permission_prompt));
    println!("  on session complete:  {}", on_off(settings.on_session_complete));
    println!("\nConfig file: {}", config::config_path().display());
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
