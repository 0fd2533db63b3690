//! Team registry and membership checks.
//!
//! Stands in for the platform's auth/team service: an in-memory map of teams
//! and a bearer-token → user mapping, seeded from a JSON file at startup or
//! programmatically in tests. Token issuance itself lives outside this
//! subsystem; the registry only answers "is this caller a member of that
//! team?" before any store operation runs.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;

/// Error from an authorization check.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("team not found: {0}")]
    UnknownTeam(String),
    #[error("caller is not a member of team {0}")]
    NotAMember(String),
    #[error("missing or unknown bearer token")]
    BadToken,
}

/// One team: stable id, display name, and member user ids.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub members: HashSet<String>,
}

/// Seed file format: a list of teams plus token → user id mappings.
#[derive(Debug, Deserialize)]
struct RegistrySeed {
    teams: Vec<Team>,
    tokens: HashMap<String, String>,
}

/// In-memory registry of teams and bearer tokens.
#[derive(Debug, Default)]
pub struct TeamRegistry {
    teams: RwLock<HashMap<String, Team>>,
    tokens: RwLock<HashMap<String, String>>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON seed file.
    pub fn from_seed_file(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        let seed: RegistrySeed = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let teams = seed
            .teams
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        Ok(Self {
            teams: RwLock::new(teams),
            tokens: RwLock::new(seed.tokens),
        })
    }

    pub async fn add_team(&self, team: Team) {
        self.teams.write().await.insert(team.id.clone(), team);
    }

    pub async fn add_token(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens
            .write()
            .await
            .insert(token.into(), user_id.into());
    }

    pub async fn team_name(&self, team_id: &str) -> Option<String> {
        self.teams.read().await.get(team_id).map(|t| t.name.clone())
    }

    /// Check that the bearer token identifies a member of `team_id`.
    ///
    /// Returns the team's display name on success. An unknown team is
    /// `UnknownTeam` regardless of the token, so callers can map it to a 404
    /// rather than leaking membership information as a 403.
    pub async fn authorize(
        &self,
        token: Option<&str>,
        team_id: &str,
    ) -> Result<String, AuthError> {
        let teams = self.teams.read().await;
        let team = teams
            .get(team_id)
            .ok_or_else(|| AuthError::UnknownTeam(team_id.to_string()))?;

        let token = token.ok_or(AuthError::BadToken)?;
        let tokens = self.tokens.read().await;
        let user_id = tokens.get(token).ok_or(AuthError::BadToken)?;

        if team.members.contains(user_id) {
            Ok(team.name.clone())
        } else {
            Err(AuthError::NotAMember(team_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> TeamRegistry {
        let registry = TeamRegistry::new();
        registry
            .add_team(Team {
                id: "team-1".to_string(),
                name: "Code Warriors".to_string(),
                members: ["user-1".to_string()].into_iter().collect(),
            })
            .await;
        registry.add_token("tok-alice", "user-1").await;
        registry.add_token("tok-mallory", "user-9").await;
        registry
    }

    #[tokio::test]
    async fn member_is_authorized_and_gets_display_name() {
        let registry = seeded().await;
        let name = registry.authorize(Some("tok-alice"), "team-1").await.unwrap();
        assert_eq!(name, "Code Warriors");
    }

    #[tokio::test]
    async fn non_member_and_bad_token_are_rejected() {
        let registry = seeded().await;
        assert!(matches!(
            registry.authorize(Some("tok-mallory"), "team-1").await,
            Err(AuthError::NotAMember(_))
        ));
        assert!(matches!(
            registry.authorize(Some("tok-nobody"), "team-1").await,
            Err(AuthError::BadToken)
        ));
        assert!(matches!(
            registry.authorize(None, "team-1").await,
            Err(AuthError::BadToken)
        ));
    }

    #[tokio::test]
    async fn unknown_team_wins_over_bad_token() {
        let registry = seeded().await;
        assert!(matches!(
            registry.authorize(None, "team-404").await,
            Err(AuthError::UnknownTeam(_))
        ));
    }
}
