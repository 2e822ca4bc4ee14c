// Persisted lineup shape: `{ "formation": "F7", "positions": { "1": ... } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::formation::{FormationId, SlotId};

use super::player::PlayerRef;

/// A lineup as it lives inside a match or team record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredLineup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation: Option<String>,
    #[serde(default)]
    pub positions: BTreeMap<String, PlayerRef>,
}

impl StoredLineup {
    pub fn new(formation: FormationId, positions: BTreeMap<String, PlayerRef>) -> Self {
        StoredLineup {
            formation: Some(formation.as_str().to_string()),
            positions,
        }
    }

    /// Read a stored lineup. Requires an object with an object `positions`;
    /// anything else means "no lineup". Individual entries that cannot be
    /// read are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let positions = obj.get("positions")?.as_object()?;
        Some(Self::from_parts(obj, positions))
    }

    /// Like [`StoredLineup::from_value`], but an object without `positions`
    /// is taken to be the bare slot map that early lineups were saved as.
    pub fn from_value_or_legacy(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        match obj.get("positions") {
            Some(Value::Object(positions)) => Some(Self::from_parts(obj, positions)),
            Some(_) => None,
            None => Some(StoredLineup {
                formation: None,
                positions: parse_positions(obj),
            }),
        }
    }

    fn from_parts(obj: &Map<String, Value>, positions: &Map<String, Value>) -> Self {
        StoredLineup {
            formation: obj
                .get("formation")
                .and_then(Value::as_str)
                .map(str::to_string),
            positions: parse_positions(positions),
        }
    }

    /// The lineup's own formation, if it recorded one.
    pub fn formation_id(&self) -> Option<FormationId> {
        self.formation.as_deref().map(FormationId::resolve)
    }

    /// Entries keyed by a numeric slot id. Other keys are ignored.
    pub fn slot_entries(&self) -> impl Iterator<Item = (SlotId, &PlayerRef)> + '_ {
        self.positions
            .iter()
            .filter_map(|(key, player)| key.trim().parse::<SlotId>().ok().map(|id| (id, player)))
    }

    pub fn get(&self, slot: SlotId) -> Option<&PlayerRef> {
        self.slot_entries()
            .find(|(id, _)| *id == slot)
            .map(|(_, player)| player)
    }

    pub fn to_value(&self) -> Value {
        // BTreeMap<String, _> and plain enums cannot fail to serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn parse_positions(map: &Map<String, Value>) -> BTreeMap<String, PlayerRef> {
    let mut positions = BTreeMap::new();
    for (key, raw) in map {
        if raw.is_null() {
            continue;
        }
        match PlayerRef::from_value(raw) {
            Some(player) => {
                positions.insert(key.clone(), player);
            }
            None => warn!("Skipping unreadable lineup entry for slot '{}'", key),
        }
    }
    positions
}
