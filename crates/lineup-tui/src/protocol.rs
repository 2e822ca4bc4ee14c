// Messages exchanged between the TUI and the app orchestrator.
//
// The TUI sends `UserCommand`s; the orchestrator answers with `UiUpdate`s
// carrying a full `EditorSnapshot` after every change.

use lineup_core::formation::{Anchor, FormationId, SlotId};
use lineup_core::lineup::{MemberId, PendingDrag, RosterMember, RosterStatus, SaveStatus};
use lineup_core::store::StoreError;
use lineup_core::viewer::LineupView;

// ---------------------------------------------------------------------------
// TUI -> app
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Pick up an available roster member.
    PickUpMember(MemberId),
    /// Pick up the occupant of a slot.
    PickUpSlot(SlotId),
    /// Drop the picked-up member on a slot.
    DropOnSlot(SlotId),
    CancelDrag,
    ClearSlot(SlotId),
    ToggleFormation,
    Save,
    ReloadRoster,
    Quit,
}

// ---------------------------------------------------------------------------
// app -> TUI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum UiUpdate {
    Snapshot(Box<EditorSnapshot>),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One-line message shown in place of the help bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// A formation slot as drawn by the editor pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    pub slot_id: SlotId,
    pub label: &'static str,
    pub anchor: Anchor,
    pub occupant: Option<RosterMember>,
}

/// Everything the TUI needs to draw the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub club_name: String,
    /// e.g. "match m1".
    pub target: String,
    pub formation: FormationId,
    /// Slots of the current formation, in catalog order.
    pub slots: Vec<SlotRow>,
    /// Roster members not in a slot, in roster order.
    pub available: Vec<RosterMember>,
    /// Assignments kept for slots the current formation lacks.
    pub hidden_count: usize,
    pub pending: Option<PendingDrag>,
    pub roster_status: RosterStatus,
    pub save_status: SaveStatus,
    /// Read-only projection of the last saved lineup.
    pub saved_view: LineupView,
}

impl EditorSnapshot {
    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Background task results
// ---------------------------------------------------------------------------

/// Results reported back to the orchestrator by spawned backend calls.
#[derive(Debug)]
pub enum TaskEvent {
    RosterLoaded {
        /// Matches the load request; stale results are dropped.
        generation: u64,
        result: Result<Vec<RosterMember>, StoreError>,
    },
    SaveFinished(Result<(), StoreError>),
}
