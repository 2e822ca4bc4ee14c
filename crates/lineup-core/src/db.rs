// SQLite persistence layer for members, teams, matches and saved lineups.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{info, warn};

use crate::formation::FormationId;
use crate::lineup::player::{MemberId, RosterMember};
use crate::lineup::stored::StoredLineup;
use crate::store::{LineupRecord, LineupStore, LineupTarget, RosterProvider, StoreError};

/// SQLite-backed store for rosters and lineups. Serves as the local
/// stand-in for the hosted backend.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS members (
                id         TEXT PRIMARY KEY,
                full_name  TEXT NOT NULL,
                avatar_url TEXT
            );

            CREATE TABLE IF NOT EXISTS teams (
                id     TEXT PRIMARY KEY,
                name   TEXT NOT NULL,
                tag    TEXT,
                lineup TEXT
            );

            CREATE TABLE IF NOT EXISTS team_members (
                team_id   TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
                member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                PRIMARY KEY (team_id, member_id)
            );

            CREATE TABLE IF NOT EXISTS matches (
                id         TEXT PRIMARY KEY,
                team_id    TEXT NOT NULL REFERENCES teams(id),
                opponent   TEXT NOT NULL,
                match_date TEXT NOT NULL,
                formation  TEXT NOT NULL,
                lineup     TEXT,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_matches_team_id ON matches(team_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Members and teams
    // ------------------------------------------------------------------

    /// Insert a member or refresh their name and avatar.
    pub fn upsert_member(&self, member: &RosterMember) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO members (id, full_name, avatar_url) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                full_name  = excluded.full_name,
                avatar_url = excluded.avatar_url",
            params![member.id.as_str(), member.full_name, member.avatar_url],
        )
        .context("failed to upsert member")?;
        Ok(())
    }

    /// Insert a team or update its name and category tag. The saved lineup
    /// is left untouched.
    pub fn upsert_team(&self, id: &str, name: &str, tag: Option<&str>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO teams (id, name, tag) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                tag  = excluded.tag",
            params![id, name, tag],
        )
        .context("failed to upsert team")?;
        Ok(())
    }

    /// Make sure a team row exists, named after its id when new. A given
    /// tag replaces the stored one.
    pub fn ensure_team(&self, id: &str, tag: Option<&str>) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO teams (id, name, tag) VALUES (?1, ?1, ?2)",
            params![id, tag],
        )
        .context("failed to create team")?;
        if let Some(tag) = tag {
            conn.execute("UPDATE teams SET tag = ?2 WHERE id = ?1", params![id, tag])
                .context("failed to update team tag")?;
        }
        Ok(())
    }

    pub fn team_exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
        .context("failed to check team existence")
    }

    pub fn member_exists(&self, id: &MemberId) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )
        .context("failed to check member existence")
    }

    /// Create the match if it does not exist yet. A new match gets the
    /// formation suggested by its team's category tag. Returns the match's
    /// formation.
    pub fn ensure_match(
        &self,
        id: &str,
        team_id: &str,
        opponent: &str,
        match_date: NaiveDate,
    ) -> Result<FormationId> {
        let conn = self.conn();
        let tag: Option<String> = conn
            .query_row(
                "SELECT tag FROM teams WHERE id = ?1",
                params![team_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up team tag")?
            .with_context(|| format!("team {team_id} does not exist"))?;

        let suggested = FormationId::for_team_tag(tag.as_deref());
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO matches (id, team_id, opponent, match_date, formation)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    team_id,
                    opponent,
                    match_date.format("%Y-%m-%d").to_string(),
                    suggested.as_str()
                ],
            )
            .context("failed to insert match")?;
        if inserted > 0 {
            info!("Created match {} for team {} ({})", id, team_id, suggested);
        }

        let formation: String = conn
            .query_row(
                "SELECT formation FROM matches WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .context("failed to read match formation")?;
        Ok(FormationId::resolve(&formation))
    }

    // ------------------------------------------------------------------
    // Rosters
    // ------------------------------------------------------------------

    /// Members of a team ordered by name.
    pub fn roster_for_team(&self, team_id: &str) -> Result<Vec<RosterMember>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.full_name, m.avatar_url
                 FROM team_members tm JOIN members m ON m.id = tm.member_id
                 WHERE tm.team_id = ?1
                 ORDER BY m.full_name, m.id",
            )
            .context("failed to prepare roster query")?;

        let members = stmt
            .query_map(params![team_id], |row| {
                Ok(RosterMember {
                    id: MemberId::new(row.get::<_, String>(0)?),
                    full_name: row.get(1)?,
                    avatar_url: row.get(2)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;
        Ok(members)
    }

    /// Link a member to a team. Linking twice is a no-op.
    pub fn insert_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO team_members (team_id, member_id) VALUES (?1, ?2)",
            params![team_id, member_id.as_str()],
        )
        .context("failed to add team member")?;
        Ok(())
    }

    /// Unlink a member from a team. Returns whether a link existed.
    pub fn delete_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<bool> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM team_members WHERE team_id = ?1 AND member_id = ?2",
                params![team_id, member_id.as_str()],
            )
            .context("failed to remove team member")?;
        Ok(removed > 0)
    }

    /// Import roster rows in a single transaction. Members are upserted,
    /// unknown teams are created with their id as name, and each member is
    /// linked to its team. Returns the number of rows imported.
    pub fn import_roster(&self, rows: &[(String, RosterMember)]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for (team_id, member) in rows {
            tx.execute(
                "INSERT OR IGNORE INTO teams (id, name) VALUES (?1, ?1)",
                params![team_id],
            )
            .context("failed to create team in batch")?;
            tx.execute(
                "INSERT INTO members (id, full_name, avatar_url) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    full_name  = excluded.full_name,
                    avatar_url = excluded.avatar_url",
                params![member.id.as_str(), member.full_name, member.avatar_url],
            )
            .context("failed to upsert member in batch")?;
            tx.execute(
                "INSERT OR IGNORE INTO team_members (team_id, member_id) VALUES (?1, ?2)",
                params![team_id, member.id.as_str()],
            )
            .context("failed to link member in batch")?;
        }

        tx.commit().context("failed to commit roster import")?;
        Ok(rows.len())
    }

    // ------------------------------------------------------------------
    // Lineups
    // ------------------------------------------------------------------

    /// Load the record a lineup lives in. Returns `None` when the match or
    /// team does not exist. A lineup column holding invalid JSON is logged
    /// and treated as absent.
    pub fn read_lineup(&self, target: &LineupTarget) -> Result<Option<LineupRecord>> {
        let conn = self.conn();
        let row: Option<(String, String, Option<String>)> = match target {
            LineupTarget::Match(id) => conn
                .query_row(
                    "SELECT team_id, formation, lineup FROM matches WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .context("failed to load match lineup")?,
            LineupTarget::Team(id) => conn
                .query_row(
                    "SELECT id, tag, lineup FROM teams WHERE id = ?1",
                    params![id],
                    |row| {
                        let tag: Option<String> = row.get(1)?;
                        let formation = FormationId::for_team_tag(tag.as_deref());
                        Ok((row.get(0)?, formation.as_str().to_string(), row.get(2)?))
                    },
                )
                .optional()
                .context("failed to load team lineup")?,
        };

        Ok(row.map(|(team_id, formation, lineup)| LineupRecord {
            target: target.clone(),
            team_id,
            formation: FormationId::resolve(&formation),
            lineup: lineup.and_then(|text| parse_lineup_column(target, &text)),
        }))
    }

    /// Overwrite the saved lineup. Matches also take the lineup's formation
    /// and a fresh `updated_at`. Returns `false` when the record is missing.
    pub fn write_lineup(&self, target: &LineupTarget, lineup: &StoredLineup) -> Result<bool> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(&lineup.to_value()).context("failed to serialize lineup")?;
        let updated = match target {
            LineupTarget::Match(id) => conn
                .execute(
                    "UPDATE matches
                     SET formation = COALESCE(?2, formation), lineup = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![
                        id,
                        lineup.formation_id().map(|f| f.as_str()),
                        json_str,
                        Utc::now().to_rfc3339()
                    ],
                )
                .context("failed to save match lineup")?,
            LineupTarget::Team(id) => conn
                .execute(
                    "UPDATE teams SET lineup = ?2 WHERE id = ?1",
                    params![id, json_str],
                )
                .context("failed to save team lineup")?,
        };
        Ok(updated > 0)
    }

    /// Raw `updated_at` of a match, for display.
    pub fn match_updated_at(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT updated_at FROM matches WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read match updated_at")
    }
}

fn parse_lineup_column(target: &LineupTarget, text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable lineup stored for {}: {}", target, e);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator impls
// ---------------------------------------------------------------------------

#[async_trait]
impl RosterProvider for Database {
    async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterMember>, StoreError> {
        if !self.team_exists(team_id)? {
            return Err(StoreError::NotFound {
                entity: "team",
                id: team_id.to_string(),
            });
        }
        Ok(self.roster_for_team(team_id)?)
    }

    async fn add_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError> {
        if !self.team_exists(team_id)? {
            return Err(StoreError::NotFound {
                entity: "team",
                id: team_id.to_string(),
            });
        }
        if !self.member_exists(member_id)? {
            return Err(StoreError::NotFound {
                entity: "member",
                id: member_id.to_string(),
            });
        }
        Ok(self.insert_team_member(team_id, member_id)?)
    }

    async fn remove_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError> {
        self.delete_team_member(team_id, member_id)?;
        Ok(())
    }
}

#[async_trait]
impl LineupStore for Database {
    async fn load_lineup(&self, target: &LineupTarget) -> Result<Option<LineupRecord>, StoreError> {
        Ok(self.read_lineup(target)?)
    }

    async fn save_lineup(&self, target: &LineupTarget, lineup: &StoredLineup) -> Result<(), StoreError> {
        if self.write_lineup(target, lineup)? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: target.entity(),
                id: target.id().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::player::PlayerRef;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn seeded() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.upsert_team("alevi", "Aleví A", Some("F7")).unwrap();
        db.upsert_team("juvenil", "Juvenil", Some("Juvenil")).unwrap();
        db.import_roster(&[
            ("alevi".into(), RosterMember::new("p2", "Bernat")),
            ("alevi".into(), RosterMember::new("p1", "Anna").with_avatar("a.png")),
            ("juvenil".into(), RosterMember::new("p3", "Carla")),
        ])
        .unwrap();
        db
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 25).unwrap()
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = std::env::temp_dir().join("lineup_db_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lineup.db");
        let path = path.to_str().unwrap();

        Database::open(path).unwrap().upsert_team("alevi", "Aleví A", None).unwrap();
        let db = Database::open(path).unwrap();
        assert!(db.team_exists("alevi").unwrap());
        assert!(!db.team_exists("nobody").unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ensure_team_keeps_name_and_sets_tag() {
        let db = seeded();
        db.ensure_team("juvenil", Some("F7")).unwrap();
        db.ensure_team("cadet", None).unwrap();
        assert!(db.team_exists("cadet").unwrap());
        let (name, tag): (String, Option<String>) = db
            .conn()
            .query_row("SELECT name, tag FROM teams WHERE id = 'juvenil'", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Juvenil");
        assert_eq!(tag.as_deref(), Some("F7"));
    }

    #[test]
    fn roster_is_ordered_by_name() {
        let db = seeded();
        let roster = db.roster_for_team("alevi").unwrap();
        let names: Vec<&str> = roster.iter().map(|m| m.full_name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Bernat"]);
        assert_eq!(roster[0].avatar_url.as_deref(), Some("a.png"));
    }

    #[test]
    fn import_keeps_existing_team_name_and_updates_members() {
        let db = seeded();
        db.import_roster(&[("alevi".into(), RosterMember::new("p1", "Anna Puig"))])
            .unwrap();
        let roster = db.roster_for_team("alevi").unwrap();
        assert_eq!(roster.len(), 2);
        let anna = roster.iter().find(|m| m.id == MemberId::new("p1")).unwrap();
        assert_eq!(anna.full_name, "Anna Puig");
        assert_eq!(anna.avatar_url, None);
    }

    #[test]
    fn ensure_match_suggests_formation_from_tag() {
        let db = seeded();
        assert_eq!(
            db.ensure_match("m1", "alevi", "CF Rival", date()).unwrap(),
            FormationId::F7
        );
        assert_eq!(
            db.ensure_match("m2", "juvenil", "CF Rival", date()).unwrap(),
            FormationId::F11
        );
        // Existing matches keep their formation.
        assert_eq!(
            db.ensure_match("m1", "juvenil", "Other", date()).unwrap(),
            FormationId::F7
        );
        assert!(db.ensure_match("m3", "ghost", "CF Rival", date()).is_err());
    }

    #[test]
    fn match_lineup_round_trip() {
        let db = seeded();
        db.ensure_match("m1", "alevi", "CF Rival", date()).unwrap();

        let record = db.read_lineup(&LineupTarget::Match("m1".into())).unwrap().unwrap();
        assert_eq!(record.team_id, "alevi");
        assert_eq!(record.formation, FormationId::F7);
        assert!(record.lineup.is_none());

        let mut positions = BTreeMap::new();
        positions.insert("1".to_string(), PlayerRef::from(&RosterMember::new("p1", "Anna")));
        let stored = StoredLineup::new(FormationId::F11, positions);
        assert!(db.write_lineup(&LineupTarget::Match("m1".into()), &stored).unwrap());

        let record = db.read_lineup(&LineupTarget::Match("m1".into())).unwrap().unwrap();
        assert_eq!(record.formation, FormationId::F11);
        assert_eq!(record.stored_lineup(), Some(stored));
        assert!(db.match_updated_at("m1").unwrap().is_some());
    }

    #[test]
    fn team_lineup_uses_tag_formation() {
        let db = seeded();
        let target = LineupTarget::Team("alevi".into());
        let stored = StoredLineup::from_value(&json!({"formation": "F7", "positions": {"3": "Bernat"}})).unwrap();
        assert!(db.write_lineup(&target, &stored).unwrap());
        let record = db.read_lineup(&target).unwrap().unwrap();
        assert_eq!(record.formation, FormationId::F7);
        assert_eq!(record.lineup, Some(json!({"formation": "F7", "positions": {"3": "Bernat"}})));
    }

    #[test]
    fn missing_records() {
        let db = seeded();
        let target = LineupTarget::Match("nope".into());
        assert!(db.read_lineup(&target).unwrap().is_none());
        assert!(!db.write_lineup(&target, &StoredLineup::default()).unwrap());
    }

    #[test]
    fn corrupt_lineup_column_reads_as_absent() {
        let db = seeded();
        db.conn()
            .execute("UPDATE teams SET lineup = '{not json' WHERE id = 'alevi'", [])
            .unwrap();
        let record = db.read_lineup(&LineupTarget::Team("alevi".into())).unwrap().unwrap();
        assert!(record.lineup.is_none());
    }

    #[tokio::test]
    async fn collaborator_impls_map_missing_records() {
        let db = seeded();
        let err = db.team_roster("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "team", .. }));

        let err = db
            .add_team_member("alevi", &MemberId::new("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "member", .. }));

        let err = db
            .save_lineup(&LineupTarget::Match("nope".into()), &StoredLineup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "match", .. }));
    }

    #[tokio::test]
    async fn membership_changes_show_in_roster() {
        let db = seeded();
        db.add_team_member("alevi", &MemberId::new("p3")).await.unwrap();
        assert_eq!(db.team_roster("alevi").await.unwrap().len(), 3);
        db.remove_team_member("alevi", &MemberId::new("p2")).await.unwrap();
        let roster = db.team_roster("alevi").await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(!roster.iter().any(|m| m.id == MemberId::new("p2")));
    }
}
