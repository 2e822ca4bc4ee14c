// CSV roster loading for seeding the local database.
//
// Expected columns: team_id,id,full_name,avatar_url (avatar_url may be empty).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::lineup::player::RosterMember;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to store imported roster: {0}")]
    Store(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    team_id: String,
    id: String,
    full_name: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<(String, RosterMember)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawRosterRow>() {
        match result {
            Ok(raw) => {
                if raw.team_id.is_empty() || raw.id.is_empty() {
                    warn!("skipping roster row for '{}': missing team or member id", raw.full_name);
                    continue;
                }
                let mut member = RosterMember::new(raw.id, raw.full_name);
                member.avatar_url = raw.avatar_url.filter(|url| !url.is_empty());
                rows.push((raw.team_id, member));
            }
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(rows)
}

/// Load `(team_id, member)` rows from a CSV file. Malformed rows are skipped.
pub fn load_roster_csv(path: &Path) -> Result<Vec<(String, RosterMember)>, RosterImportError> {
    let file = std::fs::File::open(path).map_err(|e| RosterImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_roster_from_reader(file).map_err(|e| RosterImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load a roster CSV and import it into `db` in one transaction.
pub fn seed_database(db: &Database, path: &Path) -> Result<usize, RosterImportError> {
    let rows = load_roster_csv(path)?;
    let count = db.import_roster(&rows)?;
    info!("Imported {} roster rows from {}", count, path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::player::MemberId;

    #[test]
    fn reads_rows_and_empty_avatars() {
        let csv_data = "\
team_id,id,full_name,avatar_url
alevi,p1,Anna Puig,https://cdn.example/anna.png
alevi,p2, Bernat Soler ,
infantil,p3,Carla Vidal,";

        let rows = load_roster_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "alevi");
        assert_eq!(rows[0].1.avatar_url.as_deref(), Some("https://cdn.example/anna.png"));
        assert_eq!(rows[1].1.full_name, "Bernat Soler");
        assert_eq!(rows[1].1.avatar_url, None);
        assert_eq!(rows[2].1.id, MemberId::new("p3"));
    }

    #[test]
    fn avatar_column_is_optional() {
        let csv_data = "\
team_id,id,full_name
alevi,p1,Anna";
        let rows = load_roster_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.avatar_url, None);
    }

    #[test]
    fn skips_rows_without_ids() {
        let csv_data = "\
team_id,id,full_name,avatar_url
alevi,,Nobody,
,p2,Orphan,
alevi,p1,Anna,";
        let rows = load_roster_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.full_name, "Anna");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_roster_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, RosterImportError::Io { .. }));
    }

    #[test]
    fn seed_database_imports_file() {
        let dir = std::env::temp_dir().join("lineup_roster_import");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roster.csv");
        std::fs::write(
            &path,
            "team_id,id,full_name,avatar_url\nalevi,p1,Anna,\nalevi,p2,Bernat,\n",
        )
        .unwrap();

        let db = Database::open(":memory:").unwrap();
        assert_eq!(seed_database(&db, &path).unwrap(), 2);
        assert_eq!(db.roster_for_team("alevi").unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
