// Configuration loading and parsing (club.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::formation::FormationId;
use crate::lineup::editor::FormationSwitchPolicy;
use crate::store::LineupTarget;

const CLUB_FILE: &str = "club.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub club: ClubConfig,
    pub session: SessionConfig,
    pub editor: EditorConfig,
    pub backend: BackendConfig,
    pub data_paths: DataPaths,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// The record the editing session saves into: the match when one is
    /// configured, otherwise the team's default lineup.
    pub fn lineup_target(&self) -> LineupTarget {
        match &self.session.match_id {
            Some(id) => LineupTarget::Match(id.clone()),
            None => LineupTarget::Team(self.session.team_id.clone()),
        }
    }

    /// Formation for a team lineup that names none, when the session's team
    /// has no category tag to suggest one.
    pub fn untagged_team_default(&self) -> Option<FormationId> {
        self.session
            .team_tag
            .is_none()
            .then_some(self.editor.default_formation)
    }

    /// SQLite database location. Falls back to the platform data directory.
    pub fn db_path(&self) -> PathBuf {
        match &self.backend.db_path {
            Some(p) => PathBuf::from(p),
            None => default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// club.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire club.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ClubFile {
    club: ClubConfig,
    session: SessionConfig,
    #[serde(default)]
    editor: EditorSection,
    backend: BackendConfig,
    #[serde(default)]
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClubConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Team whose roster feeds the editor.
    pub team_id: String,
    /// Match being edited. When omitted the team's default lineup is edited.
    #[serde(default)]
    pub match_id: Option<String>,
    /// Category tag of the team, used to pick a formation for new matches.
    #[serde(default)]
    pub team_tag: Option<String>,
    /// Opponent recorded when the match has to be created locally.
    #[serde(default)]
    pub opponent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EditorSection {
    #[serde(default = "default_formation_str")]
    default_formation: String,
    #[serde(default)]
    formation_switch: FormationSwitchPolicy,
}

impl Default for EditorSection {
    fn default() -> Self {
        EditorSection {
            default_formation: default_formation_str(),
            formation_switch: FormationSwitchPolicy::default(),
        }
    }
}

fn default_formation_str() -> String {
    FormationId::default().as_str().to_string()
}

/// Editor settings assembled from the `[editor]` section.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub default_formation: FormationId,
    pub formation_switch: FormationSwitchPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub rest_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPaths {
    /// CSV used to seed the local database with team rosters.
    #[serde(default)]
    pub roster: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/club.toml` and (optionally)
/// `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- club.toml (required) ---
    let club_path = config_dir.join(CLUB_FILE);
    let club_text = read_file(&club_path)?;
    let club_file: ClubFile = toml::from_str(&club_text).map_err(|e| ConfigError::ParseError {
        path: club_path.clone(),
        source: e,
    })?;

    let default_formation = FormationId::parse(&club_file.editor.default_formation).map_err(|e| {
        ConfigError::ValidationError {
            field: "editor.default_formation".into(),
            message: e.to_string(),
        }
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join(CREDENTIALS_FILE);
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        club: club_file.club,
        session: club_file.session,
        editor: EditorConfig {
            default_formation,
            formation_switch: club_file.editor.formation_switch,
        },
        backend: club_file.backend,
        data_paths: club_file.data_paths,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/club.toml` from `defaults/club.toml` on first run.
///
/// Returns the path written, or `None` when the club file already exists.
/// Credentials are never seeded; `credentials.toml` is written by hand.
pub fn seed_club_config(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CLUB_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CLUB_FILE);
    let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("no {} and cannot read {}: {e}", target.display(), source.display()),
    })?;

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
    }
    std::fs::write(&target, content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot write {}: {e}", target.display()),
    })?;
    Ok(Some(target))
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    seed_club_config(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("cat", "club", "lineup")
        .map(|dirs| dirs.data_dir().join("lineup.db"))
        .unwrap_or_else(|| PathBuf::from("lineup.db"))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.session.team_id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "session.team_id".into(),
            message: "must not be empty".into(),
        });
    }

    if config
        .session
        .match_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "session.match_id".into(),
            message: "must not be empty when present".into(),
        });
    }

    if config.backend.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "backend.request_timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    if config.backend.kind == BackendKind::Rest {
        match config.backend.rest_url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(url) => {
                return Err(ConfigError::ValidationError {
                    field: "backend.rest_url".into(),
                    message: format!("must be an http(s) URL, got {url}"),
                });
            }
            None => {
                return Err(ConfigError::ValidationError {
                    field: "backend.rest_url".into(),
                    message: "required when backend.kind = \"rest\"".into(),
                });
            }
        }
        if config.credentials.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::ValidationError {
                field: "credentials.api_key".into(),
                message: "required when backend.kind = \"rest\"".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_CLUB: &str = r#"
[club]
name = "CE Test"

[session]
team_id = "alevi-a"
match_id = "m-2026-10-25"

[editor]
default_formation = "F7"
formation_switch = "purge"

[backend]
kind = "sqlite"
db_path = "test.db"

[data_paths]
roster = "data/roster.csv"
"#;

    /// Write `club` (and optional `credentials`) into a fresh temp dir.
    fn temp_config(name: &str, club: &str, credentials: Option<&str>) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("club.toml"), club).unwrap();
        if let Some(creds) = credentials {
            fs::write(config_dir.join("credentials.toml"), creds).unwrap();
        }
        tmp
    }

    #[test]
    fn load_valid_config() {
        let tmp = temp_config("lineup_config_valid", VALID_CLUB, None);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.club.name, "CE Test");
        assert_eq!(config.session.team_id, "alevi-a");
        assert_eq!(config.editor.default_formation, FormationId::F7);
        assert_eq!(config.editor.formation_switch, FormationSwitchPolicy::Purge);
        assert_eq!(config.backend.kind, BackendKind::Sqlite);
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.db_path(), PathBuf::from("test.db"));
        assert_eq!(config.data_paths.roster.as_deref(), Some("data/roster.csv"));
        assert_eq!(
            config.lineup_target(),
            LineupTarget::Match("m-2026-10-25".into())
        );
        assert!(config.credentials.api_key.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn editor_section_is_optional() {
        let club = r#"
[club]
name = "CE Test"
[session]
team_id = "infantil"
[backend]
kind = "sqlite"
"#;
        let tmp = temp_config("lineup_config_minimal", club, None);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.editor.default_formation, FormationId::F11);
        assert_eq!(config.editor.formation_switch, FormationSwitchPolicy::Hide);
        assert_eq!(config.lineup_target(), LineupTarget::Team("infantil".into()));
        assert_eq!(config.untagged_team_default(), Some(FormationId::F11));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn team_tag_suppresses_default_formation() {
        let club = VALID_CLUB.replace("match_id", "team_tag = \"Futbol 11\"\nmatch_id");
        let tmp = temp_config("lineup_config_team_tag", &club, None);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.session.team_tag.as_deref(), Some("Futbol 11"));
        assert_eq!(config.untagged_team_default(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_default_formation() {
        let club = VALID_CLUB.replace("default_formation = \"F7\"", "default_formation = \"F9\"");
        let tmp = temp_config("lineup_config_bad_formation", &club, None);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "editor.default_formation"),
            "got {err}"
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_team_id() {
        let club = VALID_CLUB.replace("team_id = \"alevi-a\"", "team_id = \"  \"");
        let tmp = temp_config("lineup_config_empty_team", &club, None);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "session.team_id"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        let club = VALID_CLUB.replace("kind = \"sqlite\"", "kind = \"rest\"");
        let tmp = temp_config("lineup_config_rest_no_url", &club, None);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "backend.rest_url"));
        let _ = fs::remove_dir_all(&tmp);

        let club = club.replace(
            "db_path = \"test.db\"",
            "rest_url = \"https://club.example.supabase.co\"",
        );
        let tmp = temp_config("lineup_config_rest_no_key", &club, None);
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "credentials.api_key"));
        let _ = fs::remove_dir_all(&tmp);

        let tmp = temp_config(
            "lineup_config_rest_ok",
            &club,
            Some("api_key = \"anon-key\"\n"),
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.credentials.api_key.as_deref(), Some("anon-key"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let club = VALID_CLUB.replace(
            "db_path = \"test.db\"",
            "db_path = \"test.db\"\nrequest_timeout_secs = 0",
        );
        let tmp = temp_config("lineup_config_zero_timeout", &club, None);
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ValidationError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let tmp = temp_config("lineup_config_malformed", "[club\nname=", None);
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_club_toml_is_file_not_found() {
        let tmp = std::env::temp_dir().join("lineup_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn club_config_is_seeded_once() {
        let tmp = std::env::temp_dir().join("lineup_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/club.toml"), VALID_CLUB).unwrap();
        fs::write(tmp.join("defaults/credentials.toml.example"), "api_key = \"\"").unwrap();

        let seeded = seed_club_config(&tmp).unwrap();
        assert_eq!(seeded, Some(tmp.join("config/club.toml")));
        assert!(!tmp.join("config/credentials.toml").exists());
        assert!(load_config_from(&tmp).is_ok());

        fs::write(tmp.join("config/club.toml"), "# edited").unwrap();
        assert_eq!(seed_club_config(&tmp).unwrap(), None);
        assert_eq!(
            fs::read_to_string(tmp.join("config/club.toml")).unwrap(),
            "# edited"
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeding_without_defaults_fails() {
        let tmp = std::env::temp_dir().join("lineup_config_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            seed_club_config(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
