// Team roster membership editing with optimistic updates.

use tracing::info;

use crate::lineup::player::{MemberId, RosterMember};
use crate::optimistic::run_optimistic;
use crate::store::{RosterProvider, StoreError};

/// Locally cached membership of one team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRoster {
    pub team_id: String,
    pub members: Vec<RosterMember>,
}

impl TeamRoster {
    pub fn new(team_id: impl Into<String>) -> Self {
        TeamRoster {
            team_id: team_id.into(),
            members: Vec::new(),
        }
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.members.iter().any(|m| &m.id == id)
    }

    pub async fn refresh(&mut self, provider: &dyn RosterProvider) -> Result<(), StoreError> {
        self.members = provider.team_roster(&self.team_id).await?;
        Ok(())
    }

    /// Add `member` to the team. The cache shows the member immediately and
    /// reverts if the backend refuses; either way it is refetched after.
    pub async fn add_member(
        &mut self,
        provider: &dyn RosterProvider,
        member: RosterMember,
    ) -> Result<(), StoreError> {
        let team_id = self.team_id.clone();
        let member_id = member.id.clone();
        info!("Adding {} to team {}", member_id, team_id);
        run_optimistic(
            &mut self.members,
            |members| {
                if !members.iter().any(|m| m.id == member.id) {
                    members.push(member);
                }
            },
            provider.add_team_member(&team_id, &member_id),
            || provider.team_roster(&team_id),
        )
        .await
    }

    /// Remove a member from the team, optimistically.
    pub async fn remove_member(
        &mut self,
        provider: &dyn RosterProvider,
        member_id: &MemberId,
    ) -> Result<(), StoreError> {
        let team_id = self.team_id.clone();
        info!("Removing {} from team {}", member_id, team_id);
        run_optimistic(
            &mut self.members,
            |members| members.retain(|m| &m.id != member_id),
            provider.remove_team_member(&team_id, member_id),
            || provider.team_roster(&team_id),
        )
        .await
    }
}
