// Slot -> member mapping for one lineup.

use std::collections::BTreeMap;

use crate::formation::{FormationId, FormationSlot, SlotId};

use super::player::{MemberId, PlayerRef, RosterMember};

/// Sparse mapping from formation slot to the member playing there.
///
/// A member occupies at most one slot: [`LineupAssignment::place`] vacates
/// any slot the member already held before filling the target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineupAssignment {
    slots: BTreeMap<SlotId, RosterMember>,
}

impl LineupAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: SlotId) -> Option<&RosterMember> {
        self.slots.get(&slot)
    }

    /// The slot currently held by `id`, if any.
    pub fn slot_of(&self, id: &MemberId) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|(_, m)| &m.id == id)
            .map(|(slot, _)| *slot)
    }

    pub fn contains_member(&self, id: &MemberId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Put `member` in `slot`.
    ///
    /// Any other slot holding the same member is emptied first. Returns the
    /// member previously in `slot` when it was someone else; that member is
    /// left unassigned.
    pub fn place(&mut self, slot: SlotId, member: RosterMember) -> Option<RosterMember> {
        self.slots.retain(|s, m| *s == slot || m.id != member.id);
        self.slots
            .insert(slot, member.clone())
            .filter(|previous| previous.id != member.id)
    }

    /// Empty `slot`, returning its occupant.
    pub fn clear(&mut self, slot: SlotId) -> Option<RosterMember> {
        self.slots.remove(&slot)
    }

    /// Keep only slots matching `keep`; returns what was removed.
    pub fn retain_slots(&mut self, mut keep: impl FnMut(SlotId) -> bool) -> Vec<(SlotId, RosterMember)> {
        let removed_ids: Vec<SlotId> = self.slots.keys().copied().filter(|s| !keep(*s)).collect();
        removed_ids
            .into_iter()
            .filter_map(|s| self.slots.remove(&s).map(|m| (s, m)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &RosterMember)> {
        self.slots.iter().map(|(s, m)| (*s, m))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Catalog slots of `formation` paired with their occupants, in catalog
    /// order. Entries for slots the formation lacks are not visited.
    pub fn visible<'a>(
        &'a self,
        formation: FormationId,
    ) -> impl Iterator<Item = (&'static FormationSlot, Option<&'a RosterMember>)> + 'a {
        formation.slots().iter().map(move |s| (s, self.slots.get(&s.id)))
    }

    /// Number of entries whose slot is not part of `formation`.
    pub fn hidden_count(&self, formation: FormationId) -> usize {
        self.slots.keys().filter(|s| !formation.has_slot(**s)).count()
    }

    /// Roster members not in the lineup, in roster order.
    pub fn available<'a>(&self, roster: &'a [RosterMember]) -> Vec<&'a RosterMember> {
        roster
            .iter()
            .filter(|m| !self.contains_member(&m.id))
            .collect()
    }

    /// Persisted form of the mapping: slot ids become string keys.
    pub fn to_positions(&self) -> BTreeMap<String, PlayerRef> {
        self.slots
            .iter()
            .map(|(slot, member)| (slot.to_string(), PlayerRef::from(member)))
            .collect()
    }

    /// Whether no member appears in two slots.
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.slots.values().all(|m| seen.insert(&m.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> RosterMember {
        RosterMember::new(id, id.to_uppercase())
    }

    #[test]
    fn place_into_empty_slot() {
        let mut a = LineupAssignment::new();
        assert_eq!(a.place(1, member("a")), None);
        assert_eq!(a.get(1).unwrap().id, MemberId::new("a"));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn place_moves_instead_of_duplicating() {
        let mut a = LineupAssignment::new();
        a.place(1, member("a"));
        a.place(2, member("a"));
        assert!(a.get(1).is_none());
        assert_eq!(a.slot_of(&MemberId::new("a")), Some(2));
        assert!(a.is_consistent());
    }

    #[test]
    fn place_overwrites_and_returns_displaced() {
        let mut a = LineupAssignment::new();
        a.place(1, member("a"));
        a.place(2, member("b"));
        let displaced = a.place(2, member("a"));
        assert_eq!(displaced.unwrap().id, MemberId::new("b"));
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(2).unwrap().id, MemberId::new("a"));
    }

    #[test]
    fn replacing_self_reports_nothing_displaced() {
        let mut a = LineupAssignment::new();
        a.place(3, member("a"));
        assert_eq!(a.place(3, member("a")), None);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut a = LineupAssignment::new();
        a.place(1, member("a"));
        assert!(a.clear(1).is_some());
        let once = a.clone();
        assert!(a.clear(1).is_none());
        assert_eq!(a, once);
    }

    #[test]
    fn available_is_roster_minus_assigned() {
        let roster = vec![member("a"), member("b"), member("c")];
        let mut a = LineupAssignment::new();
        a.place(1, member("a"));
        a.place(3, member("b"));
        let ids: Vec<&str> = a.available(&roster).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn visible_skips_slots_outside_formation() {
        let mut a = LineupAssignment::new();
        a.place(11, member("x"));
        a.place(1, member("g"));
        let filled: Vec<SlotId> = a
            .visible(FormationId::F7)
            .filter(|(_, m)| m.is_some())
            .map(|(s, _)| s.id)
            .collect();
        assert_eq!(filled, vec![1]);
        assert_eq!(a.hidden_count(FormationId::F7), 1);
        assert_eq!(a.hidden_count(FormationId::F11), 0);
    }

    #[test]
    fn retain_slots_reports_removed() {
        let mut a = LineupAssignment::new();
        a.place(2, member("a"));
        a.place(9, member("b"));
        let removed = a.retain_slots(|s| FormationId::F7.has_slot(s));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, 9);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn positions_use_string_keys() {
        let mut a = LineupAssignment::new();
        a.place(10, member("a"));
        let positions = a.to_positions();
        assert!(positions.contains_key("10"));
        assert_eq!(positions["10"].display_name(), "A");
    }
}
