// Collaborator interfaces: roster membership and lineup persistence.
//
// The editor never talks to a backend directly; it goes through these
// traits. `db::Database` (SQLite) and `remote::RestBackend` (hosted REST API)
// implement both.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::formation::FormationId;
use crate::lineup::player::{MemberId, RosterMember};
use crate::lineup::stored::StoredLineup;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The record a lineup is saved into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineupTarget {
    Match(String),
    Team(String),
}

impl LineupTarget {
    pub fn id(&self) -> &str {
        match self {
            LineupTarget::Match(id) | LineupTarget::Team(id) => id,
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            LineupTarget::Match(_) => "match",
            LineupTarget::Team(_) => "team",
        }
    }
}

impl fmt::Display for LineupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity(), self.id())
    }
}

/// A match or team record as far as lineup editing is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct LineupRecord {
    pub target: LineupTarget,
    /// Team whose roster supplies the players.
    pub team_id: String,
    /// Formation column of the record.
    pub formation: FormationId,
    /// Raw persisted lineup, exactly as stored.
    pub lineup: Option<Value>,
}

impl LineupRecord {
    /// Parsed lineup, accepting the historic bare-map shape.
    pub fn stored_lineup(&self) -> Option<StoredLineup> {
        self.lineup.as_ref().and_then(StoredLineup::from_value_or_legacy)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Players currently on the team.
    async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterMember>, StoreError>;

    async fn add_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError>;

    async fn remove_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LineupStore: Send + Sync {
    async fn load_lineup(&self, target: &LineupTarget) -> Result<Option<LineupRecord>, StoreError>;

    /// Write `lineup` into the target record. Match records also get their
    /// formation column updated.
    async fn save_lineup(&self, target: &LineupTarget, lineup: &StoredLineup) -> Result<(), StoreError>;
}
