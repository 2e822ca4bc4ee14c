// Hosted REST backend (PostgREST-style API) for rosters and lineups.
//
// Every request carries the project api key both as `apikey` and as a
// bearer token. Non-2xx answers become `StoreError::Status`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::formation::FormationId;
use crate::lineup::player::{MemberId, RosterMember, UNNAMED_PLAYER};
use crate::lineup::stored::StoredLineup;
use crate::store::{LineupRecord, LineupStore, LineupTarget, RosterProvider, StoreError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const REST_PREFIX: &str = "rest/v1";
const MEMBERSHIP_TABLE: &str = "team_players";
const ROSTER_SELECT: &str = "profiles(id,full_name,avatar_url)";
const MATCH_SELECT: &str = "id,team_id,formation,lineup";
const TEAM_SELECT: &str = "id,tag,lineup";

// ---------------------------------------------------------------------------
// RestBackend
// ---------------------------------------------------------------------------

pub struct RestBackend {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("invalid REST base url {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build a backend from the `[backend]` section and credentials.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let url = config
            .backend
            .rest_url
            .as_deref()
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("backend.rest_url is not set")))?;
        let api_key = config.credentials.api_key.clone().unwrap_or_default();
        Self::new(
            url,
            api_key,
            Duration::from_secs(config.backend.request_timeout_secs),
        )
    }

    /// `<base>/rest/v1/<table>?<query>`.
    pub fn endpoint(&self, table: &str, query: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(&format!("{REST_PREFIX}/{table}"))
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("invalid endpoint for {table}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub fn roster_url(&self, team_id: &str) -> Result<Url, StoreError> {
        self.endpoint(
            MEMBERSHIP_TABLE,
            &[
                ("select", ROSTER_SELECT.to_string()),
                ("team_id", eq(team_id)),
            ],
        )
    }

    pub fn membership_url(&self, team_id: &str, member_id: &MemberId) -> Result<Url, StoreError> {
        self.endpoint(
            MEMBERSHIP_TABLE,
            &[("team_id", eq(team_id)), ("player_id", eq(member_id.as_str()))],
        )
    }

    pub fn lineup_url(&self, target: &LineupTarget) -> Result<Url, StoreError> {
        let (table, select) = table_for(target);
        self.endpoint(
            table,
            &[("id", eq(target.id())), ("select", select.to_string())],
        )
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Send `request` and return the body as JSON (`Null` for empty bodies).
    async fn send(&self, request: RequestBuilder) -> Result<Value, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        if !status.is_success() {
            warn!("REST request failed with {}: {}", status, body);
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn table_for(target: &LineupTarget) -> (&'static str, &'static str) {
    match target {
        LineupTarget::Match(_) => ("matches", MATCH_SELECT),
        LineupTarget::Team(_) => ("teams", TEAM_SELECT),
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Read roster rows of the form `[{"profiles": {id, full_name, avatar_url}}]`.
/// Rows whose profile is missing or has no id are skipped.
pub fn parse_roster_rows(body: &Value) -> Result<Vec<RosterMember>, StoreError> {
    let rows = body
        .as_array()
        .ok_or_else(|| StoreError::Decode("roster response is not an array".into()))?;

    let mut members = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(profile) = row.get("profiles").and_then(Value::as_object) else {
            debug!("Skipping roster row without profile: {}", row);
            continue;
        };
        let id = match profile.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                debug!("Skipping roster profile without id");
                continue;
            }
        };
        let full_name = profile
            .get("full_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNNAMED_PLAYER);
        let mut member = RosterMember::new(id, full_name);
        member.avatar_url = profile
            .get("avatar_url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        members.push(member);
    }
    Ok(members)
}

/// Read the first row of a match or team lookup. An empty array means the
/// record does not exist.
pub fn parse_lineup_row(target: &LineupTarget, body: &Value) -> Result<Option<LineupRecord>, StoreError> {
    let rows = body
        .as_array()
        .ok_or_else(|| StoreError::Decode("lineup response is not an array".into()))?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let (team_id, formation) = match target {
        LineupTarget::Match(_) => {
            let team_id = row
                .get("team_id")
                .and_then(value_as_id)
                .ok_or_else(|| StoreError::Decode("match row has no team_id".into()))?;
            let formation = row
                .get("formation")
                .and_then(Value::as_str)
                .map(FormationId::resolve)
                .unwrap_or_default();
            (team_id, formation)
        }
        LineupTarget::Team(id) => {
            let tag = row.get("tag").and_then(Value::as_str);
            (id.clone(), FormationId::for_team_tag(tag))
        }
    };

    let lineup = match row.get("lineup") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => serde_json::from_str(text).ok(),
        Some(value) => Some(value.clone()),
    };

    Ok(Some(LineupRecord {
        target: target.clone(),
        team_id,
        formation,
        lineup,
    }))
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// PATCH body for a lineup save. Only match records carry a formation
/// column.
pub fn save_body(target: &LineupTarget, lineup: &StoredLineup) -> Value {
    match target {
        LineupTarget::Match(_) => json!({
            "formation": lineup.formation_id().unwrap_or_default().as_str(),
            "lineup": lineup.to_value(),
        }),
        LineupTarget::Team(_) => json!({ "lineup": lineup.to_value() }),
    }
}

// ---------------------------------------------------------------------------
// Collaborator impls
// ---------------------------------------------------------------------------

#[async_trait]
impl RosterProvider for RestBackend {
    async fn team_roster(&self, team_id: &str) -> Result<Vec<RosterMember>, StoreError> {
        let url = self.roster_url(team_id)?;
        let body = self.send(self.request(Method::GET, url)).await?;
        parse_roster_rows(&body)
    }

    async fn add_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError> {
        let url = self.endpoint(MEMBERSHIP_TABLE, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&json!({ "team_id": team_id, "player_id": member_id.as_str() }));
        self.send(request).await?;
        Ok(())
    }

    async fn remove_team_member(&self, team_id: &str, member_id: &MemberId) -> Result<(), StoreError> {
        let url = self.membership_url(team_id, member_id)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[async_trait]
impl LineupStore for RestBackend {
    async fn load_lineup(&self, target: &LineupTarget) -> Result<Option<LineupRecord>, StoreError> {
        let url = self.lineup_url(target)?;
        let body = self.send(self.request(Method::GET, url)).await?;
        parse_lineup_row(target, &body)
    }

    async fn save_lineup(&self, target: &LineupTarget, lineup: &StoredLineup) -> Result<(), StoreError> {
        let (table, _) = table_for(target);
        let url = self.endpoint(table, &[("id", eq(target.id()))])?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&save_body(target, lineup));
        let body = self.send(request).await?;

        // PostgREST answers an update that matched nothing with `[]`.
        if body.as_array().is_some_and(|rows| rows.is_empty()) {
            return Err(StoreError::NotFound {
                entity: target.entity(),
                id: target.id().to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
