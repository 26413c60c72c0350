//! ccmon-hook: Claude Code hook handler binary.
//!
//! Claude Code invokes this binary on each lifecycle event with the event
//! kind as its argument and the event payload as JSON on stdin. It applies
//! the event to the shared session snapshot in ~/.ccmon and exits.
//!
//! Usage: ccmon-hook <HookEventName>
//!
//! Event names: PreToolUse, PostToolUse, Notification, Stop, UserPromptSubmit

use std::env;
use std::io::{self, Read};
use std::process;

use ccmon::hook;
use ccmon::store::SessionStore;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() >= 2 && (args[1] == "--version" || args[1] == "-V") {
        println!("ccmon-hook {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let Some(event_name) = args.get(1) else {
        eprintln!("ccmon-hook: missing hook event argument");
        eprintln!("Usage: ccmon-hook <HookEventName>");
        process::exit(1);
    };

    // Read JSON payload from stdin
    let mut payload = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut payload) {
        eprintln!("ccmon-hook: failed to read stdin: {}", e);
        process::exit(1);
    }

    let store = SessionStore::open();
    if let Err(e) = hook::run(&store, event_name, &payload) {
        eprintln!("ccmon-hook: {:#}", e);
        process::exit(1);
    }
}
