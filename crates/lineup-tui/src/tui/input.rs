// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState mutations (focus, cursors,
// overlays).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use lineup_core::lineup::SaveStatus;

use super::{Focus, ViewState};
use crate::protocol::UserCommand;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // crossterm reports Press and Release on some platforms.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    view_state.notice = None;

    if view_state.show_viewer {
        return handle_viewer(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Tab | KeyCode::BackTab => {
            view_state.focus = view_state.focus.toggled();
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            move_cursor(view_state, -1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            move_cursor(view_state, 1);
            None
        }

        KeyCode::Enter | KeyCode::Char(' ') => activate(view_state),

        KeyCode::Esc => {
            if view_state.has_pending_drag() {
                Some(UserCommand::CancelDrag)
            } else {
                None
            }
        }

        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => {
            if view_state.focus != Focus::Pitch {
                return None;
            }
            view_state
                .selected_slot()
                .filter(|slot| slot.occupant.is_some())
                .map(|slot| UserCommand::ClearSlot(slot.slot_id))
        }

        KeyCode::Char('f') => Some(UserCommand::ToggleFormation),

        KeyCode::Char('s') => {
            let saving = view_state
                .snapshot
                .as_ref()
                .is_some_and(|s| s.save_status == SaveStatus::Saving);
            if saving {
                None
            } else {
                Some(UserCommand::Save)
            }
        }

        KeyCode::Char('r') => Some(UserCommand::ReloadRoster),

        KeyCode::Char('v') => {
            view_state.show_viewer = true;
            None
        }

        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// Quit confirmation mode: `y`/`q` confirm, `n`/Esc cancel, everything else
/// is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// The saved-lineup preview is read-only.
fn handle_viewer(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('v') | KeyCode::Esc => {
            view_state.show_viewer = false;
            None
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

/// Enter on the squad picks a member up and moves focus to the pitch. Enter
/// on the pitch drops the carried member, or picks up the slot's occupant.
fn activate(view_state: &mut ViewState) -> Option<UserCommand> {
    match view_state.focus {
        Focus::Roster => {
            let id = view_state.selected_member()?.id.clone();
            view_state.focus = Focus::Pitch;
            Some(UserCommand::PickUpMember(id))
        }
        Focus::Pitch => {
            let pending = view_state.has_pending_drag();
            let slot = view_state.selected_slot()?;
            if pending {
                Some(UserCommand::DropOnSlot(slot.slot_id))
            } else if slot.occupant.is_some() {
                Some(UserCommand::PickUpSlot(slot.slot_id))
            } else {
                None
            }
        }
    }
}

fn move_cursor(view_state: &mut ViewState, delta: isize) {
    let Some(snapshot) = view_state.snapshot.as_ref() else {
        return;
    };
    let (cursor, len) = match view_state.focus {
        Focus::Roster => (&mut view_state.roster_cursor, snapshot.available.len()),
        Focus::Pitch => (&mut view_state.pitch_cursor, snapshot.slots.len()),
    };
    if len == 0 {
        *cursor = 0;
        return;
    }
    *cursor = cursor.saturating_add_signed(delta).min(len - 1);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
