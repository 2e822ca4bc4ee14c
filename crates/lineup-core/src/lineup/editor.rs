// Lineup editor: drag-and-drop assignment of roster members to formation
// slots, formation switching, and saving through a `LineupStore`.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formation::{FormationId, SlotId};
use crate::store::{LineupRecord, LineupStore, LineupTarget, RosterProvider, StoreError};

use super::assignment::LineupAssignment;
use super::player::RosterMember;
use super::stored::StoredLineup;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("failed to save lineup for {target}: {source}")]
    Save {
        target: LineupTarget,
        #[source]
        source: StoreError,
    },
}

/// Where a drag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSource {
    Roster,
    Slot(SlotId),
}

/// A member picked up but not yet dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDrag {
    pub member: RosterMember,
    pub source: DragSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The member now occupies `slot`; `displaced` is whoever was there
    /// before and is now back among the available members.
    Placed {
        slot: SlotId,
        displaced: Option<RosterMember>,
    },
    /// No pending drag, editing disabled, or unknown target slot.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterStatus {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Failed(String),
}

/// What happens to assignments whose slot the new formation lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormationSwitchPolicy {
    /// Keep them, unrendered; they come back when switching back.
    #[default]
    Hide,
    /// Drop them on switch.
    Purge,
}

/// Payload handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub target: LineupTarget,
    pub lineup: StoredLineup,
}

// ---------------------------------------------------------------------------
// LineupEditor
// ---------------------------------------------------------------------------

/// Editing session for one match or team lineup.
#[derive(Debug, Clone)]
pub struct LineupEditor {
    target: LineupTarget,
    team_id: String,
    formation: FormationId,
    assignment: LineupAssignment,
    roster: Vec<RosterMember>,
    roster_status: RosterStatus,
    pending_drag: Option<PendingDrag>,
    save_status: SaveStatus,
    switch_policy: FormationSwitchPolicy,
}

impl LineupEditor {
    /// Create an empty session. The roster starts out `Loading`; editing is
    /// refused until [`LineupEditor::set_roster`] or
    /// [`LineupEditor::load_roster`] succeeds.
    pub fn new(
        target: LineupTarget,
        team_id: impl Into<String>,
        formation: FormationId,
        switch_policy: FormationSwitchPolicy,
    ) -> Self {
        LineupEditor {
            target,
            team_id: team_id.into(),
            formation,
            assignment: LineupAssignment::new(),
            roster: Vec::new(),
            roster_status: RosterStatus::Loading,
            pending_drag: None,
            save_status: SaveStatus::Idle,
            switch_policy,
        }
    }

    /// Start a session from a loaded record, seeding its persisted lineup.
    /// See [`LineupEditor::formation_for`] for `untagged_default`.
    pub fn from_record(
        record: &LineupRecord,
        untagged_default: Option<FormationId>,
        switch_policy: FormationSwitchPolicy,
    ) -> Self {
        let stored = record.stored_lineup();
        let formation = Self::formation_for(record, untagged_default);
        let mut editor = Self::new(
            record.target.clone(),
            record.team_id.clone(),
            formation,
            switch_policy,
        );
        editor.initialize(formation, stored.as_ref());
        editor
    }

    /// Formation a session opens with. The lineup's own formation wins over
    /// the record's column. For a team record whose category gave no hint,
    /// `untagged_default` stands in for the column.
    pub fn formation_for(record: &LineupRecord, untagged_default: Option<FormationId>) -> FormationId {
        if let Some(formation) = record.stored_lineup().and_then(|s| s.formation_id()) {
            return formation;
        }
        match (&record.target, untagged_default) {
            (LineupTarget::Team(_), Some(default)) => default,
            _ => record.formation,
        }
    }

    /// Reset the session to `formation`, seeded from `existing`.
    ///
    /// Entries for slots the formation does not have are dropped. Duplicate
    /// members in the persisted data collapse to their last slot.
    pub fn initialize(&mut self, formation: FormationId, existing: Option<&StoredLineup>) {
        self.formation = formation;
        self.assignment = LineupAssignment::new();
        self.pending_drag = None;
        self.save_status = SaveStatus::Idle;

        let Some(stored) = existing else {
            debug!("Initialized empty {} lineup for {}", formation, self.target);
            return;
        };

        for (slot, player) in stored.slot_entries() {
            if !formation.has_slot(slot) {
                debug!("Dropping persisted slot {} not in {}", slot, formation);
                continue;
            }
            let member = self.canonical_member(player.to_member(slot));
            self.assignment.place(slot, member);
        }
        debug!(
            "Initialized {} lineup for {} with {} assigned",
            formation,
            self.target,
            self.assignment.len()
        );
    }

    /// Prefer the roster's copy of a member: matched by id, or by name for
    /// entries that were stored without one.
    fn canonical_member(&self, member: RosterMember) -> RosterMember {
        let found = self
            .roster
            .iter()
            .find(|r| r.id == member.id)
            .or_else(|| {
                member
                    .id
                    .is_synthetic()
                    .then(|| self.roster.iter().find(|r| r.full_name == member.full_name))
                    .flatten()
            });
        found.cloned().unwrap_or(member)
    }

    // -- Roster ------------------------------------------------------------

    pub fn set_roster(&mut self, roster: Vec<RosterMember>) {
        self.roster = roster;
        self.roster_status = RosterStatus::Ready;

        let entries: Vec<(SlotId, RosterMember)> = self
            .assignment
            .iter()
            .map(|(slot, m)| (slot, m.clone()))
            .collect();
        let mut rebuilt = LineupAssignment::new();
        for (slot, member) in entries {
            rebuilt.place(slot, self.canonical_member(member));
        }
        self.assignment = rebuilt;
        debug!("Roster ready for team {}: {} members", self.team_id, self.roster.len());
    }

    /// Record a roster fetch failure: the roster is emptied and editing is
    /// disabled until a reload succeeds.
    pub fn roster_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("Roster unavailable for team {}: {}", self.team_id, message);
        self.roster.clear();
        self.pending_drag = None;
        self.roster_status = RosterStatus::Failed(message);
    }

    /// Mark the roster as being fetched. Editing is refused until the fetch
    /// reports back through `set_roster` or `roster_failed`.
    pub fn begin_roster_load(&mut self) {
        self.roster_status = RosterStatus::Loading;
        self.pending_drag = None;
    }

    pub async fn load_roster(&mut self, provider: &dyn RosterProvider) -> Result<(), StoreError> {
        self.begin_roster_load();
        match provider.team_roster(&self.team_id).await {
            Ok(roster) => {
                self.set_roster(roster);
                Ok(())
            }
            Err(e) => {
                self.roster_failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn can_edit(&self) -> bool {
        self.roster_status == RosterStatus::Ready
    }

    // -- Formation ---------------------------------------------------------

    pub fn set_formation(&mut self, formation: FormationId) {
        if formation == self.formation {
            return;
        }
        self.formation = formation;
        match self.switch_policy {
            FormationSwitchPolicy::Hide => {
                let hidden = self.assignment.hidden_count(formation);
                if hidden > 0 {
                    debug!("{} assignments hidden by switch to {}", hidden, formation);
                }
            }
            FormationSwitchPolicy::Purge => {
                let removed = self.assignment.retain_slots(|s| formation.has_slot(s));
                if !removed.is_empty() {
                    debug!("{} assignments purged by switch to {}", removed.len(), formation);
                }
            }
        }
        if let Some(PendingDrag {
            source: DragSource::Slot(slot),
            ..
        }) = self.pending_drag
        {
            if !formation.has_slot(slot) {
                self.pending_drag = None;
            }
        }
    }

    // -- Drag and drop -----------------------------------------------------

    /// Pick up `member`. Returns `false` (and records nothing) when editing
    /// is disabled or the payload does not match the current state: a
    /// roster drag must name a roster member, a slot drag must name the
    /// slot's occupant.
    pub fn begin_drag(&mut self, member: RosterMember, source: DragSource) -> bool {
        if !self.can_edit() {
            return false;
        }
        let canonical = match source {
            DragSource::Roster => self.roster.iter().find(|r| r.id == member.id).cloned(),
            DragSource::Slot(slot) => self
                .assignment
                .get(slot)
                .filter(|occupant| occupant.id == member.id)
                .cloned(),
        };
        match canonical {
            Some(member) => {
                self.pending_drag = Some(PendingDrag { member, source });
                true
            }
            None => {
                debug!("Ignoring drag of {} from {:?}", member.id, source);
                false
            }
        }
    }

    pub fn cancel_drag(&mut self) -> Option<PendingDrag> {
        self.pending_drag.take()
    }

    pub fn pending_drag(&self) -> Option<&PendingDrag> {
        self.pending_drag.as_ref()
    }

    /// Drop the pending drag on `target`. The pending drag is consumed
    /// whatever the outcome.
    pub fn drop_on_slot(&mut self, target: SlotId) -> DropOutcome {
        let Some(drag) = self.pending_drag.take() else {
            return DropOutcome::Ignored;
        };
        if !self.can_edit() {
            return DropOutcome::Ignored;
        }
        if !self.formation.has_slot(target) {
            debug!("Ignoring drop on unknown slot {} in {}", target, self.formation);
            return DropOutcome::Ignored;
        }

        if let DragSource::Slot(source) = drag.source {
            if self.assignment.get(source).map(|m| &m.id) == Some(&drag.member.id) {
                self.assignment.clear(source);
            }
        }
        debug!("Placing {} in slot {}", drag.member.full_name, target);
        let displaced = self.assignment.place(target, drag.member);
        DropOutcome::Placed {
            slot: target,
            displaced,
        }
    }

    /// Empty `slot`, returning its former occupant.
    pub fn clear_slot(&mut self, slot: SlotId) -> Option<RosterMember> {
        if !self.can_edit() {
            return None;
        }
        let removed = self.assignment.clear(slot);
        if let Some(PendingDrag {
            source: DragSource::Slot(s),
            ..
        }) = self.pending_drag
        {
            if s == slot {
                self.pending_drag = None;
            }
        }
        removed
    }

    // -- Derived state -----------------------------------------------------

    /// Roster members not currently in a slot, in roster order.
    pub fn available_members(&self) -> Vec<&RosterMember> {
        self.assignment.available(&self.roster)
    }

    /// The persisted form of the current state. Hidden entries are included
    /// so they survive a save-and-reload.
    pub fn to_stored(&self) -> StoredLineup {
        StoredLineup::new(self.formation, self.assignment.to_positions())
    }

    // -- Saving ------------------------------------------------------------

    /// Mark a save as started and return what to send. Refused while an
    /// earlier save is still pending.
    pub fn begin_save(&mut self) -> Result<SaveRequest, EditorError> {
        if self.save_status == SaveStatus::Saving {
            return Err(EditorError::SaveInProgress);
        }
        self.save_status = SaveStatus::Saving;
        Ok(SaveRequest {
            target: self.target.clone(),
            lineup: self.to_stored(),
        })
    }

    /// Record the collaborator's answer. The assignment is left as it is
    /// either way, so a failed save can simply be retried.
    pub fn finish_save(&mut self, result: Result<(), StoreError>) -> Result<(), EditorError> {
        match result {
            Ok(()) => {
                info!("Saved {} lineup for {}", self.formation, self.target);
                self.save_status = SaveStatus::Saved;
                Ok(())
            }
            Err(source) => {
                warn!("Saving lineup for {} failed: {}", self.target, source);
                self.save_status = SaveStatus::Failed(source.to_string());
                Err(EditorError::Save {
                    target: self.target.clone(),
                    source,
                })
            }
        }
    }

    pub async fn save(&mut self, store: &dyn LineupStore) -> Result<(), EditorError> {
        let request = self.begin_save()?;
        let result = store.save_lineup(&request.target, &request.lineup).await;
        self.finish_save(result)
    }

    // -- Accessors ---------------------------------------------------------

    pub fn target(&self) -> &LineupTarget {
        &self.target
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn formation(&self) -> FormationId {
        self.formation
    }

    pub fn assignment(&self) -> &LineupAssignment {
        &self.assignment
    }

    pub fn roster(&self) -> &[RosterMember] {
        &self.roster
    }

    pub fn roster_status(&self) -> &RosterStatus {
        &self.roster_status
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn is_saving(&self) -> bool {
        self.save_status == SaveStatus::Saving
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
