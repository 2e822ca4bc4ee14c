// Formation catalog: static slot layouts for each supported formation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a slot within a formation. Stable across releases; it is
/// the join key persisted in saved lineups.
pub type SlotId = u8;

// ---------------------------------------------------------------------------
// Slot types
// ---------------------------------------------------------------------------

/// Normalized pitch coordinate, in percent. `x_percent` runs from the left
/// touchline, `y_percent` from the top of the pitch (attacking end).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub x_percent: f32,
    pub y_percent: f32,
}

/// One fixed position within a formation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormationSlot {
    pub id: SlotId,
    pub anchor: Anchor,
    /// Short positional label (GK, DEF, MC, ...).
    pub label: &'static str,
}

const fn slot(id: SlotId, x_percent: f32, y_percent: f32, label: &'static str) -> FormationSlot {
    FormationSlot {
        id,
        anchor: Anchor {
            x_percent,
            y_percent,
        },
        label,
    }
}

static F11_SLOTS: [FormationSlot; 11] = [
    slot(1, 50.0, 90.0, "GK"),
    slot(2, 20.0, 75.0, "LD"),
    slot(3, 40.0, 75.0, "DFC"),
    slot(4, 60.0, 75.0, "DFC"),
    slot(5, 80.0, 75.0, "LE"),
    slot(6, 30.0, 50.0, "MC"),
    slot(7, 70.0, 50.0, "MC"),
    slot(8, 20.0, 35.0, "ED"),
    slot(9, 80.0, 35.0, "EE"),
    slot(10, 50.0, 25.0, "MCO"),
    slot(11, 50.0, 10.0, "DC"),
];

static F7_SLOTS: [FormationSlot; 7] = [
    slot(1, 50.0, 90.0, "GK"),
    slot(2, 25.0, 70.0, "DEF"),
    slot(3, 50.0, 70.0, "DEF"),
    slot(4, 75.0, 70.0, "DEF"),
    slot(5, 35.0, 40.0, "MC"),
    slot(6, 65.0, 40.0, "MC"),
    slot(7, 50.0, 15.0, "DC"),
];

// ---------------------------------------------------------------------------
// FormationId
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown formation `{0}` (expected F7 or F11)")]
pub struct ParseFormationError(pub String);

/// Supported formations: 7-a-side and 11-a-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormationId {
    F7,
    #[default]
    F11,
}

impl FormationId {
    pub const ALL: [FormationId; 2] = [FormationId::F7, FormationId::F11];

    /// Strict parse. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Result<Self, ParseFormationError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "F7" => Ok(FormationId::F7),
            "F11" => Ok(FormationId::F11),
            _ => Err(ParseFormationError(s.to_string())),
        }
    }

    /// Lenient resolution for identifiers read back from storage.
    ///
    /// Exact identifiers win. Otherwise anything mentioning a 7 (e.g. "7v7",
    /// "Futbol 7") is the 7-a-side layout, and everything else, including
    /// the empty string, is 11-a-side.
    pub fn resolve(s: &str) -> Self {
        if let Ok(id) = Self::parse(s) {
            return id;
        }
        if s.contains('7') {
            FormationId::F7
        } else {
            FormationId::F11
        }
    }

    /// Formation suggested for a team from its category tag.
    pub fn for_team_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.to_lowercase().contains('7') => FormationId::F7,
            _ => FormationId::F11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormationId::F7 => "F7",
            FormationId::F11 => "F11",
        }
    }

    /// The ordered slot catalog for this formation.
    pub fn slots(&self) -> &'static [FormationSlot] {
        match self {
            FormationId::F7 => &F7_SLOTS,
            FormationId::F11 => &F11_SLOTS,
        }
    }

    pub fn slot(&self, id: SlotId) -> Option<&'static FormationSlot> {
        self.slots().iter().find(|s| s.id == id)
    }

    pub fn has_slot(&self, id: SlotId) -> bool {
        self.slot(id).is_some()
    }

    pub fn slot_count(&self) -> usize {
        self.slots().len()
    }

    /// The other formation. Used by the editor's formation toggle.
    pub fn toggled(&self) -> Self {
        match self {
            FormationId::F7 => FormationId::F11,
            FormationId::F11 => FormationId::F7,
        }
    }
}

impl fmt::Display for FormationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormationId {
    type Err = ParseFormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Catalog lookup by raw identifier. Unknown identifiers fall back to F11.
pub fn get_slots(formation: &str) -> &'static [FormationSlot] {
    FormationId::resolve(formation).slots()
}
