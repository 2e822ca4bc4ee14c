// App orchestrator: owns the lineup editor, applies user commands, and runs
// roster loads and saves as background tasks.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lineup_core::formation::FormationId;
use lineup_core::lineup::{
    DragSource, DropOutcome, EditorError, LineupEditor, RosterStatus, StoredLineup,
};
use lineup_core::store::{LineupRecord, LineupStore, RosterProvider};
use lineup_core::viewer;

use crate::protocol::{EditorSnapshot, Notice, SlotRow, TaskEvent, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub editor: LineupEditor,
    club_name: String,
    /// Lineup as last persisted, for the read-only preview.
    saved_lineup: Option<Value>,
    saved_formation: FormationId,
    /// What the in-flight save sent, promoted to `saved_lineup` on success.
    pending_save: Option<StoredLineup>,
    store: Arc<dyn LineupStore>,
    roster_provider: Arc<dyn RosterProvider>,
    task_tx: mpsc::Sender<TaskEvent>,
    /// Bumped on every roster load so late answers from an earlier load
    /// are ignored.
    roster_generation: u64,
}

impl AppState {
    pub fn new(
        editor: LineupEditor,
        record: &LineupRecord,
        club_name: impl Into<String>,
        store: Arc<dyn LineupStore>,
        roster_provider: Arc<dyn RosterProvider>,
        task_tx: mpsc::Sender<TaskEvent>,
    ) -> Self {
        // The preview opens in the same formation as the editor.
        let saved_formation = editor.formation();
        Self {
            editor,
            club_name: club_name.into(),
            saved_lineup: record.lineup.clone(),
            saved_formation,
            pending_save: None,
            store,
            roster_provider,
            task_tx,
            roster_generation: 0,
        }
    }

    /// Fetch the team roster in the background.
    pub fn start_roster_load(&mut self) {
        self.roster_generation += 1;
        let generation = self.roster_generation;
        self.editor.begin_roster_load();

        let provider = Arc::clone(&self.roster_provider);
        let team_id = self.editor.team_id().to_string();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = provider.team_roster(&team_id).await;
            let _ = tx.send(TaskEvent::RosterLoaded { generation, result }).await;
        });
        info!("Loading roster for team {} (gen: {})", self.editor.team_id(), generation);
    }

    /// Send the current lineup to the store in the background. Refused while
    /// an earlier save is pending.
    pub fn start_save(&mut self) -> Result<(), EditorError> {
        let request = self.editor.begin_save()?;
        self.pending_save = Some(request.lineup.clone());
        let store = Arc::clone(&self.store);
        let tx = self.task_tx.clone();
        info!("Saving {} lineup for {}", self.editor.formation(), request.target);
        tokio::spawn(async move {
            let result = store.save_lineup(&request.target, &request.lineup).await;
            let _ = tx.send(TaskEvent::SaveFinished(result)).await;
        });
        Ok(())
    }

    /// Apply a command from the TUI. Returns a message for the user, if any.
    pub fn apply_command(&mut self, cmd: UserCommand) -> Option<Notice> {
        match cmd {
            UserCommand::PickUpMember(id) => {
                let member = self.editor.roster().iter().find(|m| m.id == id).cloned()?;
                if !self.editor.begin_drag(member, DragSource::Roster) {
                    return Some(Notice::error("Roster is not ready; press r to reload"));
                }
                None
            }
            UserCommand::PickUpSlot(slot) => {
                let member = self.editor.assignment().get(slot).cloned()?;
                self.editor.begin_drag(member, DragSource::Slot(slot));
                None
            }
            UserCommand::DropOnSlot(slot) => match self.editor.drop_on_slot(slot) {
                DropOutcome::Placed {
                    displaced: Some(previous),
                    ..
                } => Some(Notice::info(format!("{} back in the squad list", previous.full_name))),
                DropOutcome::Placed { .. } => None,
                DropOutcome::Ignored => {
                    debug!("Drop on slot {} ignored", slot);
                    None
                }
            },
            UserCommand::CancelDrag => {
                self.editor.cancel_drag();
                None
            }
            UserCommand::ClearSlot(slot) => {
                self.editor.clear_slot(slot);
                None
            }
            UserCommand::ToggleFormation => {
                let next = self.editor.formation().toggled();
                self.editor.set_formation(next);
                let hidden = self.editor.assignment().hidden_count(next);
                if hidden > 0 {
                    Some(Notice::info(format!(
                        "Switched to {next}; {hidden} player(s) kept off-pitch until you switch back"
                    )))
                } else {
                    Some(Notice::info(format!("Switched to {next}")))
                }
            }
            UserCommand::Save => match self.start_save() {
                Ok(()) => Some(Notice::info("Saving...")),
                Err(EditorError::SaveInProgress) => Some(Notice::info("A save is already in progress")),
                Err(e) => Some(Notice::error(e.to_string())),
            },
            UserCommand::ReloadRoster => {
                self.start_roster_load();
                Some(Notice::info("Reloading roster..."))
            }
            UserCommand::Quit => None,
        }
    }

    /// Apply the result of a background task.
    pub fn handle_task_event(&mut self, event: TaskEvent) -> Option<Notice> {
        match event {
            TaskEvent::RosterLoaded { generation, result } => {
                if generation != self.roster_generation {
                    debug!("Discarding stale roster load (gen {})", generation);
                    return None;
                }
                match result {
                    Ok(roster) => {
                        info!("Roster loaded: {} members", roster.len());
                        self.editor.set_roster(roster);
                        None
                    }
                    Err(e) => {
                        self.editor.roster_failed(e.to_string());
                        Some(Notice::error(format!("Could not load roster: {e}")))
                    }
                }
            }
            TaskEvent::SaveFinished(result) => {
                let sent = self.pending_save.take();
                match self.editor.finish_save(result) {
                    Ok(()) => {
                        if let Some(stored) = sent {
                            self.saved_formation = stored.formation_id().unwrap_or(self.saved_formation);
                            self.saved_lineup = Some(stored.to_value());
                        }
                        Some(Notice::info("Lineup saved"))
                    }
                    Err(e) => {
                        warn!("{}", e);
                        Some(Notice::error(format!("{e}. Press s to retry")))
                    }
                }
            }
        }
    }

    pub fn build_snapshot(&self) -> EditorSnapshot {
        let formation = self.editor.formation();
        let assignment = self.editor.assignment();
        EditorSnapshot {
            club_name: self.club_name.clone(),
            target: self.editor.target().to_string(),
            formation,
            slots: assignment
                .visible(formation)
                .map(|(slot, occupant)| SlotRow {
                    slot_id: slot.id,
                    label: slot.label,
                    anchor: slot.anchor,
                    occupant: occupant.cloned(),
                })
                .collect(),
            available: self.editor.available_members().into_iter().cloned().collect(),
            hidden_count: assignment.hidden_count(formation),
            pending: self.editor.pending_drag().cloned(),
            roster_status: self.editor.roster_status().clone(),
            save_status: self.editor.save_status().clone(),
            saved_view: viewer::render(self.saved_formation.as_str(), self.saved_lineup.as_ref()),
        }
    }

    pub fn roster_ready(&self) -> bool {
        *self.editor.roster_status() == RosterStatus::Ready
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the orchestrator loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the TUI
/// 2. Results of background roster loads and saves
///
/// Pushes a fresh snapshot through `ui_tx` after every change.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut task_rx: mpsc::Receiver<TaskEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    state.start_roster_load();
    send_snapshot(&state, &ui_tx).await;

    loop {
        let notice = tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => state.apply_command(cmd),
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            event = task_rx.recv() => {
                match event {
                    Some(event) => state.handle_task_event(event),
                    // AppState keeps a sender, so this only happens on teardown.
                    None => break,
                }
            }
        };

        send_snapshot(&state, &ui_tx).await;
        if let Some(notice) = notice {
            let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
        }
    }

    if state.editor.is_saving() {
        warn!("Exiting while a save is still in flight");
    }
    info!("Application event loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
