//! Fetch orchestration and the immutable analysis snapshot.
//!
//! `PrAnalyzer` drives the fetch phase: resolve the team, list the
//! repository's pull requests, and hydrate each qualifying PR with its review
//! and commit history. The result is a `Snapshot`, over which every reporting
//! operation (see [`crate::report`]) is a pure read. A snapshot is populated
//! once per download; there is no incremental refresh.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::github::{GitHubClient, PrCommit, PullRequest, Review};
use crate::metrics::{self, PrMetadata};

/// Suffix a PR's base-branch label must carry to qualify for analysis.
pub const MAIN_BRANCH_SUFFIX: &str = ":main";

/// A pull request qualifies iff its author is a team member and it targets
/// the main branch. Non-qualifying PRs are dropped silently.
pub fn qualifies(pr: &PullRequest, members: &BTreeSet<String>) -> bool {
    members.contains(&pr.author) && pr.base_label.ends_with(MAIN_BRANCH_SUFFIX)
}

/// One qualifying pull request with its derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedPr {
    pub pr: PullRequest,
    pub meta: PrMetadata,
}

/// The immutable result of one download: the team roster and every qualifying
/// PR with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Team display name, echoed into every chart title.
    pub team_name: String,
    /// Logins of the configured team's members.
    pub members: BTreeSet<String>,
    /// Qualifying PRs in the order the API listed them.
    pub entries: Vec<AnalyzedPr>,
}

impl Snapshot {
    /// Builds a snapshot from raw per-PR records.
    ///
    /// Applies the qualifying predicate and derives metadata for the
    /// survivors. Already-filtered input passes through unchanged, so running
    /// a download's output back through here is a no-op.
    pub fn ingest(
        team_name: impl Into<String>,
        members: impl IntoIterator<Item = String>,
        prs: Vec<(PullRequest, Vec<Review>, Vec<PrCommit>)>,
    ) -> Self {
        let members: BTreeSet<String> = members.into_iter().collect();
        let entries = prs
            .into_iter()
            .filter(|(pr, _, _)| qualifies(pr, &members))
            .map(|(pr, reviews, commits)| {
                let meta = metrics::derive(&pr, &reviews, &commits);
                AnalyzedPr { pr, meta }
            })
            .collect();
        Self {
            team_name: team_name.into(),
            members,
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualifying PRs that have been merged, the unit of every latency report.
    pub(crate) fn merged(&self) -> impl Iterator<Item = &AnalyzedPr> {
        self.entries
            .iter()
            .filter(|entry| entry.pr.merged_at.is_some())
    }
}

/// The PR metrics engine. One instance serves one caller on one task; all
/// fetches are awaited sequentially and any fetch error aborts the download
/// without yielding a partial snapshot.
pub struct PrAnalyzer {
    config: AnalyzerConfig,
    client: GitHubClient,
}

impl PrAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = GitHubClient::new(config.token())?;
        Ok(Self { config, client })
    }

    /// Uses a caller-supplied client instead of building one from the config.
    pub fn with_client(config: AnalyzerConfig, client: GitHubClient) -> Self {
        Self { config, client }
    }

    /// Fetches everything and builds the snapshot.
    ///
    /// Review and commit histories are only fetched for qualifying PRs; the
    /// listing payload already carries the author and base label the predicate
    /// needs.
    pub async fn download(&self) -> Result<Snapshot, AnalyzerError> {
        let repo = &self.config.repo;
        tracing::info!(repo = %repo, org = %self.config.org, team = %self.config.org_team, "downloading");

        let members = self
            .client
            .team_members(&self.config.org, &self.config.org_team)
            .await?;
        let members: BTreeSet<String> = members.into_iter().collect();

        let listed = self.client.list_pull_requests(repo).await?;
        let total = listed.len();

        let mut prs = Vec::new();
        for pr in listed {
            if !qualifies(&pr, &members) {
                continue;
            }
            // The list payload omits additions/deletions and review requests.
            let Some(pr) = self.client.pull_request(repo, pr.number).await? else {
                continue;
            };
            let reviews = self.client.reviews(repo, pr.number).await?;
            let commits = self.client.commits(repo, pr.number).await?;
            prs.push((pr, reviews, commits));
        }
        tracing::info!(total, valid = prs.len(), "downloaded pull requests");

        Ok(Snapshot::ingest(
            self.config.org_team.clone(),
            members,
            prs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pr(author: &str, base_label: &str) -> PullRequest {
        PullRequest {
            number: 1,
            author: author.to_string(),
            base_label: base_label.to_string(),
            title: "Fix flaky test".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            merged_at: None,
            additions: 1,
            deletions: 1,
            requested_reviewers: vec![],
        }
    }

    fn team() -> BTreeSet<String> {
        ["alice".to_string(), "carol".to_string()].into_iter().collect()
    }

    #[test]
    fn test_qualifies_team_member_on_main() {
        assert!(qualifies(&pr("alice", "octo-org:main"), &team()));
    }

    #[test]
    fn test_rejects_other_base_branch() {
        assert!(!qualifies(&pr("alice", "octo-org:dev"), &team()));
    }

    #[test]
    fn test_rejects_non_team_author() {
        assert!(!qualifies(&pr("bob", "octo-org:main"), &team()));
    }

    #[test]
    fn test_ingest_filters_and_is_idempotent() {
        let prs = vec![
            (pr("alice", "octo-org:main"), vec![], vec![]),
            (pr("alice", "octo-org:dev"), vec![], vec![]),
            (pr("bob", "octo-org:main"), vec![], vec![]),
        ];
        let snapshot = Snapshot::ingest("platform", team(), prs);
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].pr.author, "alice");

        // Re-filtering the filtered set changes nothing.
        let refiltered = Snapshot::ingest(
            snapshot.team_name.clone(),
            snapshot.members.iter().cloned(),
            snapshot
                .entries
                .iter()
                .map(|entry| (entry.pr.clone(), vec![], vec![]))
                .collect(),
        );
        assert_eq!(refiltered.entries.len(), snapshot.entries.len());
    }
}
