pub mod config;
pub mod hook;
pub mod notifier;
pub mod session;
pub mod setup;
pub mod store;
pub mod tty;
pub mod tui;
pub mod watcher;

pub use config::Config;
pub use session::{determine_status, HookEvent, HookEventName, Session, Status};
pub use store::SessionStore;
pub use tty::TtyChecker;
pub use tui::{init_terminal, restore_terminal, App};
