// Lineup model: players, the slot assignment, its persisted shape, and the
// interactive editor built on top of them.

pub mod assignment;
pub mod editor;
pub mod player;
pub mod stored;

pub use assignment::LineupAssignment;
pub use editor::{
    DragSource, DropOutcome, EditorError, FormationSwitchPolicy, LineupEditor, PendingDrag,
    RosterStatus, SaveRequest, SaveStatus,
};
pub use player::{MemberId, PlayerRef, RosterMember};
pub use stored::StoredLineup;
