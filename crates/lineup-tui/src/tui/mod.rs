// Terminal lineup editor: layout, input handling, and widget rendering.
//
// The TUI keeps a `ViewState` holding the latest `EditorSnapshot` plus purely
// local state (focus, cursors, overlays). The app orchestrator pushes
// `UiUpdate` messages over an mpsc channel; the TUI applies them and
// re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use lineup_core::lineup::RosterMember;

use crate::protocol::{EditorSnapshot, Notice, NoticeLevel, SlotRow, UiUpdate, UserCommand};

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Which panel receives cursor movement and Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Roster,
    Pitch,
}

impl Focus {
    pub fn toggled(self) -> Self {
        match self {
            Focus::Roster => Focus::Pitch,
            Focus::Pitch => Focus::Roster,
        }
    }
}

/// TUI-local state. `snapshot` is `None` until the orchestrator sends the
/// first one.
#[derive(Debug, Default)]
pub struct ViewState {
    pub snapshot: Option<EditorSnapshot>,
    pub focus: Focus,
    /// Index into `snapshot.available`.
    pub roster_cursor: usize,
    /// Index into `snapshot.slots`.
    pub pitch_cursor: usize,
    pub confirm_quit: bool,
    /// Show the read-only preview of the saved lineup instead of the editor.
    pub show_viewer: bool,
    pub notice: Option<Notice>,
}

impl ViewState {
    pub fn selected_member(&self) -> Option<&RosterMember> {
        self.snapshot.as_ref()?.available.get(self.roster_cursor)
    }

    pub fn selected_slot(&self) -> Option<&SlotRow> {
        self.snapshot.as_ref()?.slots.get(self.pitch_cursor)
    }

    pub fn has_pending_drag(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.pending.is_some())
    }

    /// Keep both cursors inside their lists after the lists change.
    fn clamp_cursors(&mut self) {
        let (roster_len, pitch_len) = self
            .snapshot
            .as_ref()
            .map_or((0, 0), |s| (s.available.len(), s.slots.len()));
        self.roster_cursor = self.roster_cursor.min(roster_len.saturating_sub(1));
        self.pitch_cursor = self.pitch_cursor.min(pitch_len.saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            state.snapshot = Some(*snapshot);
            state.clamp_cursors();
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(notice);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete editor frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::roster::render(frame, layout.roster, state);
    if state.show_viewer {
        widgets::pitch::render_saved(frame, layout.pitch, state);
    } else {
        widgets::pitch::render(frame, layout.pitch, state);
    }
    render_help_bar(frame, layout.help_bar, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

/// Key hints for the current mode.
pub fn help_text(state: &ViewState) -> &'static str {
    if state.show_viewer {
        " v/Esc:Back to editor | q:Quit"
    } else if state.has_pending_drag() {
        " Enter:Drop on slot | Tab:Panel | ↑↓:Move | Esc:Cancel"
    } else {
        " Tab:Panel | ↑↓:Move | Enter:Pick up | d:Clear | f:F7/F11 | s:Save | r:Reload | v:Preview | q:Quit"
    }
}

/// A pending notice replaces the key hints until the next key press.
fn render_help_bar(frame: &mut Frame, area: ratatui::layout::Rect, state: &ViewState) {
    let span = match &state.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Error => Color::Red,
            };
            Span::styled(
                format!(" {}", notice.text),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )
        }
        None => Span::styled(
            help_text(state),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::DIM),
        ),
    };
    let paragraph = Paragraph::new(Line::from(span)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (enters raw mode, enables alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal before the original hook prints the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    // ~30fps
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 3. Main loop
    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    // Mouse and resize events: the next tick redraws anyway.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("terminal input failed")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    // 4. Restore terminal
    ratatui::restore();

    result
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::lineup::{DragSource, PendingDrag};

    fn draw(state: &ViewState) -> String {
        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal.draw(|frame| render_frame(frame, state)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.snapshot.is_none());
        assert_eq!(state.focus, Focus::Roster);
        assert!(!state.confirm_quit);
        assert!(!state.show_viewer);
        assert!(state.selected_member().is_none());
        assert!(state.selected_slot().is_none());
    }

    #[test]
    fn snapshot_update_clamps_cursors() {
        let mut state = ViewState {
            roster_cursor: 5,
            pitch_cursor: 20,
            ..ViewState::default()
        };
        apply_ui_update(&mut state, UiUpdate::Snapshot(Box::new(fixtures::snapshot())));
        assert_eq!(state.roster_cursor, 1);
        assert_eq!(state.pitch_cursor, 6);
        assert_eq!(state.selected_member().unwrap().full_name, "Carla Vidal");
        assert_eq!(state.selected_slot().unwrap().label, "DC");
    }

    #[test]
    fn notice_update_is_stored() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Notice(Notice::error("boom")));
        assert_eq!(state.notice, Some(Notice::error("boom")));
    }

    #[test]
    fn help_text_follows_mode() {
        let mut state = ViewState {
            snapshot: Some(fixtures::snapshot()),
            ..ViewState::default()
        };
        assert!(help_text(&state).contains("Pick up"));

        if let Some(snap) = state.snapshot.as_mut() {
            snap.pending = Some(PendingDrag {
                member: RosterMember::new("b", "Bernat Soler"),
                source: DragSource::Roster,
            });
        }
        assert!(help_text(&state).contains("Drop"));

        state.show_viewer = true;
        assert!(help_text(&state).contains("Back to editor"));
    }

    #[test]
    fn render_frame_before_first_snapshot() {
        let text = draw(&ViewState::default());
        assert!(text.contains("Waiting"));
    }

    #[test]
    fn render_frame_shows_editor() {
        let state = ViewState {
            snapshot: Some(fixtures::snapshot()),
            ..ViewState::default()
        };
        let text = draw(&state);
        assert!(text.contains("CF Demo"));
        assert!(text.contains("Bernat Soler"));
        assert!(text.contains("Anna Puig"));
    }

    #[test]
    fn render_frame_preview_without_saved_lineup() {
        let state = ViewState {
            snapshot: Some(fixtures::snapshot()),
            show_viewer: true,
            ..ViewState::default()
        };
        assert!(draw(&state).contains("Lineup not available"));
    }

    #[test]
    fn render_frame_with_notice_and_quit_overlay() {
        let state = ViewState {
            snapshot: Some(fixtures::snapshot()),
            notice: Some(Notice::info("Lineup saved")),
            confirm_quit: true,
            ..ViewState::default()
        };
        let text = draw(&state);
        assert!(text.contains("Lineup saved"));
        assert!(text.contains("Really quit?"));
    }
}
