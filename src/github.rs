//! GitHub API client and the typed records it returns.
//!
//! The loosely-typed API payloads are converted into immutable value structs at
//! this boundary. Records missing fields the analysis depends on (author,
//! creation timestamp, review submission time) are dropped here with a debug
//! log, so everything past this module can rely on the fields being present.

use chrono::{DateTime, Utc};
use octocrab::models::pulls;
use octocrab::models::repos::RepoCommit;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};

use crate::config::RepoId;
use crate::error::AnalyzerError;

/// A pull request, reduced to the fields the analysis reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// Login of the PR author.
    pub author: String,
    /// Base branch label in "owner:branch" form.
    pub base_label: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// `None` means not yet merged or closed unmerged.
    pub merged_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    /// Logins of users with an open review request on this PR.
    pub requested_reviewers: Vec<String>,
}

/// A submitted review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Login of the reviewer.
    pub author: String,
    pub submitted_at: DateTime<Utc>,
}

/// A commit on a PR. Only the authored timestamp matters downstream; the
/// pass counter does not filter commits by author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrCommit {
    pub authored_at: DateTime<Utc>,
}

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl From<Octocrab> for GitHubClient {
    fn from(octocrab: Octocrab) -> Self {
        Self { octocrab }
    }
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self, AnalyzerError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;
        Ok(Self { octocrab })
    }

    /// Resolves the team by display name and returns its member logins.
    ///
    /// Zero or multiple matches are configuration errors; the source of truth
    /// for "team member" is exactly one team per run.
    pub async fn team_members(
        &self,
        org: &str,
        team_name: &str,
    ) -> Result<Vec<String>, AnalyzerError> {
        let mut matches = Vec::new();
        let mut page = self.octocrab.teams(org).list().per_page(100).send().await?;
        loop {
            matches.extend(
                page.items
                    .iter()
                    .filter(|team| team.name == team_name)
                    .map(|team| team.slug.clone()),
            );
            match self.octocrab.get_page(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }

        let slug = match matches.as_slice() {
            [slug] => slug.clone(),
            [] => {
                return Err(AnalyzerError::TeamNotFound {
                    org: org.to_string(),
                    team: team_name.to_string(),
                })
            }
            _ => {
                return Err(AnalyzerError::AmbiguousTeam {
                    org: org.to_string(),
                    team: team_name.to_string(),
                    count: matches.len(),
                })
            }
        };

        let mut members = Vec::new();
        let mut page = self
            .octocrab
            .teams(org)
            .members(&slug)
            .per_page(100)
            .send()
            .await?;
        loop {
            members.extend(page.items.iter().map(|member| member.login.clone()));
            match self.octocrab.get_page(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }
        tracing::debug!(org, team = team_name, members = members.len(), "resolved team");
        Ok(members)
    }

    /// Lists every pull request in the repository, any state.
    ///
    /// List payloads omit additions/deletions and requested reviewers, so those
    /// fields come back zeroed/empty; [`GitHubClient::pull_request`] fills them
    /// in for the PRs that survive filtering.
    pub async fn list_pull_requests(
        &self,
        repo: &RepoId,
    ) -> Result<Vec<PullRequest>, AnalyzerError> {
        let mut prs = Vec::new();
        let mut page = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .list()
            .state(octocrab::params::State::All)
            .per_page(100)
            .send()
            .await?;
        loop {
            prs.extend(page.items.iter().filter_map(convert_pull));
            match self.octocrab.get_page(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }
        tracing::debug!(repo = %repo, count = prs.len(), "listed pull requests");
        Ok(prs)
    }

    /// Fetches one pull request with its full field set.
    pub async fn pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Option<PullRequest>, AnalyzerError> {
        let pr = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .get(number)
            .await?;
        Ok(convert_pull(&pr))
    }

    /// Fetches the full review history of one pull request.
    pub async fn reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<Review>, AnalyzerError> {
        let mut reviews = Vec::new();
        let mut page = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .list_reviews(number)
            .per_page(100)
            .send()
            .await?;
        loop {
            reviews.extend(page.items.iter().filter_map(convert_review));
            match self.octocrab.get_page(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(reviews)
    }

    /// Fetches the commits on one pull request.
    pub async fn commits(&self, repo: &RepoId, number: u64) -> Result<Vec<PrCommit>, AnalyzerError> {
        let mut commits = Vec::new();
        let mut page: Page<RepoCommit> = self
            .octocrab
            .pulls(&repo.owner, &repo.repo)
            .pr_commits(number)
            .send()
            .await?;
        loop {
            commits.extend(page.items.iter().filter_map(convert_commit));
            match self.octocrab.get_page(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(commits)
    }
}

fn convert_pull(pr: &pulls::PullRequest) -> Option<PullRequest> {
    let author = match &pr.user {
        Some(user) => user.login.clone(),
        None => {
            tracing::debug!(number = pr.number, "dropping PR without author");
            return None;
        }
    };
    let created_at = match pr.created_at {
        Some(created_at) => created_at,
        None => {
            tracing::debug!(number = pr.number, "dropping PR without created_at");
            return None;
        }
    };
    Some(PullRequest {
        number: pr.number,
        author,
        base_label: pr.base.label.clone().unwrap_or_default(),
        title: pr.title.clone().unwrap_or_default(),
        created_at,
        merged_at: pr.merged_at,
        additions: pr.additions.unwrap_or(0),
        deletions: pr.deletions.unwrap_or(0),
        requested_reviewers: pr
            .requested_reviewers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|user| user.login.clone())
            .collect(),
    })
}

fn convert_review(review: &pulls::Review) -> Option<Review> {
    let author = review.user.as_ref()?.login.clone();
    let submitted_at = review.submitted_at?;
    Some(Review {
        author,
        submitted_at,
    })
}

fn convert_commit(commit: &RepoCommit) -> Option<PrCommit> {
    let authored_at = commit.commit.author.as_ref()?.date?;
    Some(PrCommit { authored_at })
}
