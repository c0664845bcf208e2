//! Per-PR metric derivation.
//!
//! Everything in this module is a pure function over the typed records from
//! [`crate::github`]: the reviewer set, the review-pass counter, merge latency,
//! change volume, and the title-verb normalizer used for categorical reporting.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::github::{PrCommit, PullRequest, Review};

/// Derived metrics for one pull request. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrMetadata {
    /// Users who were requested as reviewers or submitted a review,
    /// excluding the PR author. May include non-team members.
    pub reviewers: BTreeSet<String>,
    /// Number of commit-then-review cycles, see [`count_review_passes`].
    pub review_passes: u32,
    /// Elapsed hours from creation to merge; `None` iff the PR is unmerged.
    pub hours_to_merge: Option<f64>,
    /// Additions plus deletions.
    pub total_changes: u64,
}

/// Computes the metadata record for one pull request.
pub fn derive(pr: &PullRequest, reviews: &[Review], commits: &[PrCommit]) -> PrMetadata {
    let mut reviewers: BTreeSet<String> = pr
        .requested_reviewers
        .iter()
        .cloned()
        .chain(reviews.iter().map(|review| review.author.clone()))
        .collect();
    reviewers.remove(&pr.author);

    let hours_to_merge = pr
        .merged_at
        .map(|merged_at| (merged_at - pr.created_at).num_seconds() as f64 / 3600.0);

    PrMetadata {
        reviewers,
        review_passes: count_review_passes(reviews, commits, &pr.author),
        hours_to_merge,
        total_changes: pr.additions + pr.deletions,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Commit,
    Review,
}

/// Counts "author pushed work, then got reviewed" cycles.
///
/// Commits (any author) and reviews by non-authors are merged into one stream
/// sorted by timestamp; each review that follows a commit increments the count.
/// The scan starts in the "last event was a commit" state, so a review-only
/// stream still counts one pass. Commits are queued ahead of reviews before the
/// stable sort, so a commit and a review sharing a timestamp count as a
/// commit-then-review cycle.
pub fn count_review_passes(reviews: &[Review], commits: &[PrCommit], author: &str) -> u32 {
    let mut events: Vec<(DateTime<Utc>, EventKind)> = commits
        .iter()
        .map(|commit| (commit.authored_at, EventKind::Commit))
        .chain(
            reviews
                .iter()
                .filter(|review| review.author != author)
                .map(|review| (review.submitted_at, EventKind::Review)),
        )
        .collect();
    events.sort_by_key(|(at, _)| *at);

    let mut last = EventKind::Commit;
    let mut passes = 0;
    for (_, kind) in events {
        if last == EventKind::Commit && kind == EventKind::Review {
            passes += 1;
        }
        last = kind;
    }
    passes
}

static TAG_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[\w\-& ]+\] ").expect("valid tag pattern"));

/// Normalizes a PR title to its leading verb.
///
/// Strips one leading `[tag] ` prefix, lowercases, takes the first token,
/// drops a trailing colon, and folds the common gerund/past-tense forms
/// (adding/added, fixing, removing) onto their imperatives. Returns an empty
/// string for an empty title.
pub fn title_verb(title: &str) -> String {
    let stripped = TAG_PREFIX.replace(title, "");
    let lowered = stripped.to_lowercase();
    let token = lowered.split_whitespace().next().unwrap_or("");
    let verb = token.strip_suffix(':').unwrap_or(token);
    match verb {
        "adding" | "added" => "add".to_string(),
        "fixing" => "fix".to_string(),
        "removing" => "remove".to_string(),
        _ => verb.to_string(),
    }
}
