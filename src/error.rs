//! Error taxonomy for the analyzer.
//!
//! Configuration problems (missing credential, unresolved team) get their own
//! variants so callers can distinguish them from upstream API failures, which
//! are propagated as-is without retry.

use thiserror::Error;

use crate::config::TOKEN_ENV_VAR;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// No token was passed explicitly and the fallback env var is unset.
    #[error("no GitHub credential: pass a token or set {TOKEN_ENV_VAR}")]
    MissingCredential,

    /// The configured team display name matched no team in the organization.
    #[error("no team named {team:?} in organization {org:?}")]
    TeamNotFound { org: String, team: String },

    /// The configured team display name matched more than one team.
    #[error("team name {team:?} matches {count} teams in organization {org:?}")]
    AmbiguousTeam {
        org: String,
        team: String,
        count: usize,
    },

    /// Environment-sourced configuration could not be parsed.
    #[error("invalid environment configuration")]
    Environment(#[from] envy::Error),

    /// Any failure from the GitHub API client (auth, rate limit, not-found).
    #[error("GitHub API request failed")]
    Upstream(#[from] octocrab::Error),
}
