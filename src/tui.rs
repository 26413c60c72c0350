//! TUI module for ccmon.
//!
//! Provides the terminal dashboard for monitoring Claude Code sessions
//! using Ratatui. Displays one row per session with keyboard navigation.

use crate::session::{extract_project_name, format_relative_time, Session, Status};
use crate::store::SessionStore;
use crate::watcher::StoreWatcher;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io::stdout;
use std::time::{Duration, Instant};

/// How often the session list is re-read without a file event. Keeps
/// relative times moving and lets timeout-based eviction show up even
/// when no hook fires.
const REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Main application state for the TUI.
pub struct App {
    /// Store handle the dashboard reads through
    store: SessionStore,
    /// All loaded sessions, in store order (oldest first)
    sessions: Vec<Session>,
    /// Currently selected index in the session list
    selected_index: usize,
    /// List state for ratatui
    list_state: ListState,
    /// Flag to signal the app should quit
    should_quit: bool,
    /// File watcher for instant updates when another process writes
    watcher: Option<StoreWatcher>,
}

impl App {
    /// Create a new App reading through the given store.
    pub fn new(store: SessionStore) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        let watcher = StoreWatcher::new(store.path()).ok();

        Self {
            store,
            sessions: Vec::new(),
            selected_index: 0,
            list_state,
            should_quit: false,
            watcher,
        }
    }

    /// Re-read the session list from the store. Dead and stale sessions
    /// are evicted by the read itself.
    fn load_sessions(&mut self) {
        self.sessions = self.store.sessions();
        self.clamp_selection();
    }

    /// Ensure the selected index stays within bounds after sessions change.
    fn clamp_selection(&mut self) {
        if !self.sessions.is_empty() {
            if self.selected_index >= self.sessions.len() {
                self.selected_index = self.sessions.len() - 1;
            }
            self.list_state.select(Some(self.selected_index));
        } else {
            self.selected_index = 0;
            self.list_state.select(None);
        }
    }

    /// Main event loop - runs the TUI until quit.
    pub fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<()> {
        self.load_sessions();
        let mut last_refresh = Instant::now();

        while !self.should_quit {
            // Draw the UI
            terminal.draw(|frame| self.draw(frame))?;

            // Poll for events with short timeout for responsiveness
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }

            // Check file watcher for writes from hook invocations
            if let Some(ref mut watcher) = self.watcher {
                if watcher.poll_changes() {
                    self.load_sessions();
                    last_refresh = Instant::now();
                }
            }

            // Periodic refresh so stale sessions disappear without file activity
            if last_refresh.elapsed() >= REFRESH_INTERVAL {
                self.load_sessions();
                last_refresh = Instant::now();
            }
        }

        // Land any pruning the read passes scheduled
        self.store.flush();
        Ok(())
    }

    /// Render the UI to the frame.
    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        // Layout: header, content, footer
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Min(5),    // content
                Constraint::Length(1), // footer
            ])
            .split(area);

        self.render_header(frame, main_chunks[0]);
        self.render_sessions(frame, main_chunks[1]);
        self.render_footer(frame, main_chunks[2]);
    }

    /// Handle a key event. Returns true if the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Handle quit keys
        let is_quit_key = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            _ => false,
        };

        if is_quit_key {
            self.should_quit = true;
            return true;
        }

        match key.code {
            KeyCode::Char('r') => {
                self.load_sessions();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_previous();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next();
            }
            _ => {}
        }
        false
    }

    /// Select the previous session in the list.
    fn select_previous(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = self.sessions.len() - 1;
        } else {
            self.selected_index -= 1;
        }
        self.list_state.select(Some(self.selected_index));
    }

    /// Select the next session in the list.
    fn select_next(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        if self.selected_index >= self.sessions.len() - 1 {
            self.selected_index = 0;
        } else {
            self.selected_index += 1;
        }
        self.list_state.select(Some(self.selected_index));
    }

    /// Render the header bar.
    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let session_count = self.sessions.len();
        let session_text = if session_count == 1 {
            "1 session".to_string()
        } else {
            format!("{} sessions", session_count)
        };

        let title = format!(
            "  ccmon{:>width$}",
            format!("{}  ", session_text),
            width = (area.width as usize).saturating_sub(10)
        );

        let header = Paragraph::new(title)
            .style(Style::default().fg(Color::White).bold())
            .block(Block::default().borders(Borders::ALL));

        frame.render_widget(header, area);
    }

    /// Render the session list, one row per session in store order.
    fn render_sessions(&self, frame: &mut Frame, area: Rect) {
        if self.sessions.is_empty() {
            let msg = Paragraph::new(
                "No active sessions\n\nRun `ccmon setup` to install the Claude Code hooks,\nthen start a conversation in any project.",
            )
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
            frame.render_widget(msg, area);
            return;
        }

        let items: Vec<ListItem> = self
            .sessions
            .iter()
            .map(|session| {
                ListItem::new(session_row(session)).style(Style::default().fg(status_color(session.status)))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");

        let mut list_state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    /// Render the footer with keyboard shortcuts.
    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer_text = "  \u{2191}/\u{2193}: nav   r: refresh   q: quit";
        let footer = Paragraph::new(footer_text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(footer, area);
    }
}

/// Format one session as a list row: indicator, project, status, activity.
fn session_row(session: &Session) -> String {
    format!(
        "  {} {:<20} {:<18} {}",
        session.status.indicator(),
        extract_project_name(&session.cwd),
        session.status.label(),
        format_relative_time(session.updated_at)
    )
}

/// Row color per status. Waiting sessions stand out, stopped ones recede.
fn status_color(status: Status) -> Color {
    match status {
        Status::Running => Color::Rgb(34, 197, 94),
        Status::WaitingInput => Color::Rgb(245, 158, 11),
        Status::Stopped => Color::DarkGray,
    }
}

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;
    Ok(terminal)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal() -> Result<()> {
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}
