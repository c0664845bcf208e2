//! Analyzer configuration.
//!
//! Everything the engine needs is captured in an explicit `AnalyzerConfig` at
//! construction time, including the API credential. The only environment access
//! happens here: `AnalyzerConfig::new` falls back to `GITHUB_API_TOKEN` when no
//! token is passed, and `AnalyzerConfig::from_env` loads the whole config from
//! the environment for interactive use.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalyzerError;

/// Env var consulted when no credential is passed explicitly.
pub const TOKEN_ENV_VAR: &str = "GITHUB_API_TOKEN";

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl RepoId {
    /// Parses an "owner/name" pair. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            Some(RepoId {
                owner: parts[0].trim().to_string(),
                repo: parts[1].trim().to_string(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Configuration for one analysis run.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Repository whose pull requests are analyzed.
    pub repo: RepoId,
    /// Organization the team is resolved from.
    pub org: String,
    /// Team display name; must match exactly one team in the organization.
    pub org_team: String,
    /// Resolved API credential.
    token: String,
}

impl AnalyzerConfig {
    /// Builds a config, resolving the credential immediately.
    ///
    /// An explicit `token` wins; otherwise `GITHUB_API_TOKEN` is consulted.
    /// Fails with [`AnalyzerError::MissingCredential`] if neither is present, so
    /// the engine itself never touches the environment.
    pub fn new(
        repo: RepoId,
        org: impl Into<String>,
        org_team: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, AnalyzerError> {
        let token = match token {
            Some(token) => token,
            None => std::env::var(TOKEN_ENV_VAR).map_err(|_| AnalyzerError::MissingCredential)?,
        };
        Ok(Self {
            repo,
            org: org.into(),
            org_team: org_team.into(),
            token,
        })
    }

    /// Loads the full config from the environment.
    ///
    /// Expected vars: `REPO` ("owner/name"), `ORG`, `ORG_TEAM`, and optionally
    /// `GITHUB_API_TOKEN`.
    pub fn from_env() -> Result<Self, AnalyzerError> {
        let raw: RawEnvConfig = envy::from_env()?;
        Self::new(raw.repo, raw.org, raw.org_team, raw.github_api_token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Shape of the environment-sourced config before credential resolution.
#[derive(Debug, Deserialize)]
struct RawEnvConfig {
    #[serde(deserialize_with = "deserialize_repo_id")]
    repo: RepoId,
    org: String,
    org_team: String,
    github_api_token: Option<String>,
}

fn deserialize_repo_id<'de, D>(deserializer: D) -> Result<RepoId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    RepoId::parse(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("expected \"owner/name\", got {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_repo_id_parse() {
        let id = RepoId::parse("octo-org/widgets").unwrap();
        assert_eq!(id.owner, "octo-org");
        assert_eq!(id.repo, "widgets");
        assert_eq!(id.to_string(), "octo-org/widgets");

        assert!(RepoId::parse("no-slash").is_none());
        assert!(RepoId::parse("too/many/parts").is_none());
        assert!(RepoId::parse("/missing-owner").is_none());
    }

    #[test]
    #[serial]
    fn test_explicit_token_wins() {
        env::set_var(TOKEN_ENV_VAR, "env-token");
        let config = AnalyzerConfig::new(
            RepoId::parse("o/r").unwrap(),
            "octo-org",
            "platform",
            Some("explicit-token".to_string()),
        )
        .unwrap();
        assert_eq!(config.token(), "explicit-token");
        env::remove_var(TOKEN_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_env_token_fallback() {
        env::set_var(TOKEN_ENV_VAR, "env-token");
        let config =
            AnalyzerConfig::new(RepoId::parse("o/r").unwrap(), "octo-org", "platform", None)
                .unwrap();
        assert_eq!(config.token(), "env-token");
        env::remove_var(TOKEN_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_missing_credential() {
        env::remove_var(TOKEN_ENV_VAR);
        let result =
            AnalyzerConfig::new(RepoId::parse("o/r").unwrap(), "octo-org", "platform", None);
        assert!(matches!(result, Err(AnalyzerError::MissingCredential)));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("REPO", "octo-org/widgets");
        env::set_var("ORG", "octo-org");
        env::set_var("ORG_TEAM", "Platform Team");
        env::set_var(TOKEN_ENV_VAR, "env-token");

        let config = AnalyzerConfig::from_env().expect("failed to load config");
        assert_eq!(config.repo.owner, "octo-org");
        assert_eq!(config.repo.repo, "widgets");
        assert_eq!(config.org, "octo-org");
        assert_eq!(config.org_team, "Platform Team");
        assert_eq!(config.token(), "env-token");

        env::remove_var("REPO");
        env::remove_var("ORG");
        env::remove_var("ORG_TEAM");
        env::remove_var(TOKEN_ENV_VAR);
    }
}
