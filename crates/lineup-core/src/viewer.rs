// Read-only lineup projection: places a saved lineup onto the formation's
// pitch anchors. Tolerates missing lineups, unknown formations and either
// stored player shape.

use serde::Serialize;
use serde_json::Value;

use crate::formation::{Anchor, FormationId, SlotId};
use crate::lineup::player::{initial_of, PlayerRef};
use crate::lineup::stored::StoredLineup;

/// Result of rendering a lineup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LineupView {
    /// No lineup (or no `positions`) was saved.
    Unavailable,
    Pitch(PitchView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchView {
    pub formation: FormationId,
    /// One marker per catalog slot, in catalog order.
    pub markers: Vec<SlotMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotMarker {
    pub slot_id: SlotId,
    pub anchor: Anchor,
    pub label: &'static str,
    /// `None` renders as an empty placeholder showing `label`.
    pub occupant: Option<MarkerOccupant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerOccupant {
    pub name: String,
    pub avatar_url: Option<String>,
    /// Shown in place of a missing avatar.
    pub initial: char,
}

impl From<&PlayerRef> for MarkerOccupant {
    fn from(player: &PlayerRef) -> Self {
        let name = player.display_name().to_string();
        MarkerOccupant {
            initial: initial_of(&name),
            avatar_url: player.avatar_url().map(str::to_string),
            name,
        }
    }
}

impl PitchView {
    pub fn marker(&self, slot_id: SlotId) -> Option<&SlotMarker> {
        self.markers.iter().find(|m| m.slot_id == slot_id)
    }

    pub fn filled_count(&self) -> usize {
        self.markers.iter().filter(|m| m.occupant.is_some()).count()
    }

    pub fn empty_count(&self) -> usize {
        self.markers.len() - self.filled_count()
    }
}

impl LineupView {
    pub fn pitch(&self) -> Option<&PitchView> {
        match self {
            LineupView::Pitch(p) => Some(p),
            LineupView::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.pitch().is_some()
    }
}

/// Render a lineup exactly as it comes out of storage.
pub fn render(formation: &str, lineup: Option<&Value>) -> LineupView {
    let stored = lineup.and_then(StoredLineup::from_value);
    render_stored(formation, stored.as_ref())
}

/// Render an already-parsed lineup. `formation` is resolved leniently; an
/// unrecognized value shows the 11-a-side layout.
pub fn render_stored(formation: &str, lineup: Option<&StoredLineup>) -> LineupView {
    let Some(lineup) = lineup else {
        return LineupView::Unavailable;
    };
    let formation = FormationId::resolve(formation);
    let markers = formation
        .slots()
        .iter()
        .map(|slot| SlotMarker {
            slot_id: slot.id,
            anchor: slot.anchor,
            label: slot.label,
            occupant: lineup.get(slot.id).map(MarkerOccupant::from),
        })
        .collect();
    LineupView::Pitch(PitchView { formation, markers })
}

/// One-line text form of a marker, e.g. `GK: Joan` or `DEF: [empty]`.
pub fn format_marker_text(marker: &SlotMarker) -> String {
    match &marker.occupant {
        Some(o) => format!("{}: {}", marker.label, o.name),
        None => format!("{}: [empty]", marker.label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_lineup_is_unavailable() {
        assert_eq!(render("F7", None), LineupView::Unavailable);
        assert_eq!(render("F7", Some(&json!(null))), LineupView::Unavailable);
        assert_eq!(
            render("F7", Some(&json!({"formation": "F7"}))),
            LineupView::Unavailable
        );
    }

    #[test]
    fn empty_positions_render_all_placeholders() {
        let view = render("F11", Some(&json!({"positions": {}})));
        let pitch = view.pitch().unwrap();
        assert_eq!(pitch.markers.len(), 11);
        assert_eq!(pitch.filled_count(), 0);
        assert_eq!(pitch.marker(11).unwrap().label, "DC");
    }

    #[test]
    fn detailed_player_renders_name_and_avatar() {
        let view = render(
            "F7",
            Some(&json!({
                "formation": "F7",
                "positions": {"1": {"id": "p1", "full_name": "Joan", "avatar_url": "j.png"}}
            })),
        );
        let pitch = view.pitch().unwrap();
        let gk = pitch.marker(1).unwrap();
        let occupant = gk.occupant.as_ref().unwrap();
        assert_eq!(occupant.name, "Joan");
        assert_eq!(occupant.avatar_url.as_deref(), Some("j.png"));
        assert_eq!(gk.anchor, FormationId::F7.slot(1).unwrap().anchor);
        assert_eq!(pitch.empty_count(), 6);
    }

    #[test]
    fn bare_name_renders_directly() {
        let view = render("F11", Some(&json!({"positions": {"9": "Pere"}})));
        let occupant = view.pitch().unwrap().marker(9).unwrap().occupant.clone().unwrap();
        assert_eq!(occupant.name, "Pere");
        assert_eq!(occupant.avatar_url, None);
        assert_eq!(occupant.initial, 'P');
    }

    #[test]
    fn unknown_formation_uses_f11() {
        let view = render("whatever", Some(&json!({"positions": {}})));
        assert_eq!(view.pitch().unwrap().formation, FormationId::F11);
        let view = render("Futbol 7", Some(&json!({"positions": {}})));
        assert_eq!(view.pitch().unwrap().formation, FormationId::F7);
    }

    #[test]
    fn out_of_range_slot_is_not_rendered() {
        let view = render("F7", Some(&json!({"positions": {"11": "Xavi"}})));
        let pitch = view.pitch().unwrap();
        assert_eq!(pitch.markers.len(), 7);
        assert_eq!(pitch.filled_count(), 0);
        assert!(pitch.marker(11).is_none());
    }

    #[test]
    fn marker_text() {
        let view = render("F7", Some(&json!({"positions": {"1": "Joan"}})));
        let pitch = view.pitch().unwrap();
        assert_eq!(format_marker_text(pitch.marker(1).unwrap()), "GK: Joan");
        assert_eq!(format_marker_text(pitch.marker(2).unwrap()), "DEF: [empty]");
    }
}
