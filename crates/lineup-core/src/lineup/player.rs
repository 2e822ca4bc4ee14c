// Roster members and the player references stored inside saved lineups.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::formation::SlotId;

/// Display name used when a stored reference carries no usable name.
pub const UNNAMED_PLAYER: &str = "Player";

const SYNTHETIC_ID_PREFIX: &str = "name:";

/// Opaque roster member identifier (a profile id in the backend).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        MemberId(id.into())
    }

    /// Id for a stored reference that only carried a name. The prefix keeps
    /// it from ever matching a real backend id; the slot keeps two entries
    /// with the same name apart.
    pub fn synthetic(slot: SlotId, name: &str) -> Self {
        MemberId(format!("{SYNTHETIC_ID_PREFIX}{slot}:{name}"))
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player eligible for a team, as provided by the roster collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: MemberId,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl RosterMember {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        RosterMember {
            id: MemberId::new(id),
            full_name: full_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Uppercased first letter of the name, shown when there is no avatar.
    pub fn initial(&self) -> char {
        initial_of(&self.full_name)
    }
}

pub(crate) fn initial_of(name: &str) -> char {
    name.chars()
        .next()
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('?')
}

// ---------------------------------------------------------------------------
// Stored references
// ---------------------------------------------------------------------------

/// A player as written into a persisted lineup. Older lineups stored only
/// the display name; newer ones store the profile object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerRef {
    NameOnly(String),
    Detailed(DetailedRef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedRef {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Accept string or numeric ids; anything else reads as absent.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl PlayerRef {
    /// Parse a single stored value. `null`, empty strings and values of the
    /// wrong shape yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(PlayerRef::NameOnly(s.clone())),
            Value::Object(_) => serde_json::from_value(value.clone())
                .ok()
                .map(PlayerRef::Detailed),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            PlayerRef::NameOnly(name) => name,
            PlayerRef::Detailed(d) => non_empty(&d.full_name)
                .or_else(|| non_empty(&d.name))
                .unwrap_or(UNNAMED_PLAYER),
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            PlayerRef::NameOnly(_) => None,
            PlayerRef::Detailed(d) => non_empty(&d.avatar_url),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PlayerRef::NameOnly(_) => None,
            PlayerRef::Detailed(d) => d.id.as_deref(),
        }
    }

    /// Normalize the entry stored at `slot` into the single internal shape
    /// used by the editor.
    pub fn to_member(&self, slot: SlotId) -> RosterMember {
        let name = self.display_name().to_string();
        let id = match self.id() {
            Some(id) => MemberId::new(id),
            None => MemberId::synthetic(slot, &name),
        };
        RosterMember {
            id,
            full_name: name,
            avatar_url: self.avatar_url().map(str::to_string),
        }
    }
}

impl From<&RosterMember> for PlayerRef {
    fn from(member: &RosterMember) -> Self {
        PlayerRef::Detailed(DetailedRef {
            id: Some(member.id.as_str().to_string()),
            full_name: Some(member.full_name.clone()),
            name: None,
            avatar_url: member.avatar_url.clone(),
        })
    }
}
