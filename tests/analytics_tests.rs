use chrono::{DateTime, TimeZone, Utc};
use pr_analytics::report::{
    ChartKind, DEFAULT_HISTOGRAM_BINS, DEFAULT_MAX_HOURS, DEFAULT_SCATTER_MAX_HOURS,
    DEFAULT_TOP_VERBS,
};
use pr_analytics::{
    AnalyzerConfig, AnalyzerError, GitHubClient, PrAnalyzer, PrCommit, PullRequest, RepoId, Review,
    Snapshot,
};
use serde_json::json;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn pr(
    number: u64,
    author: &str,
    base_label: &str,
    title: &str,
    merged_at: Option<DateTime<Utc>>,
    additions: u64,
    deletions: u64,
) -> PullRequest {
    PullRequest {
        number,
        author: author.to_string(),
        base_label: base_label.to_string(),
        title: title.to_string(),
        created_at: at(1, 0),
        merged_at,
        additions,
        deletions,
        requested_reviewers: vec![],
    }
}

fn review(author: &str, submitted_at: DateTime<Utc>) -> Review {
    Review {
        author: author.to_string(),
        submitted_at,
    }
}

fn commit(authored_at: DateTime<Utc>) -> PrCommit {
    PrCommit { authored_at }
}

/// A small team with merged, unmerged, and out-of-scope pull requests.
fn snapshot() -> Snapshot {
    let team = ["alice".to_string(), "carol".to_string(), "dave".to_string()];
    let prs = vec![
        // Merged, two review passes (commit/commit/review, commit/review/review).
        (
            pr(1, "alice", "octo-org:main", "[Team-X] Added login flow", Some(at(2, 0)), 80, 20),
            vec![
                review("carol", at(1, 3)),
                review("carol", at(1, 5)),
                review("dave", at(1, 6)),
            ],
            vec![commit(at(1, 1)), commit(at(1, 2)), commit(at(1, 4))],
        ),
        // Merged quickly, one outside reviewer who must not reach aggregates.
        (
            pr(2, "carol", "octo-org:main", "Fix: flaky pipeline", Some(at(1, 6)), 10, 5),
            vec![review("zed", at(1, 2)), review("alice", at(1, 3))],
            vec![commit(at(1, 1))],
        ),
        // Unmerged: appears in count-based reports, never in latency reports.
        (
            pr(3, "dave", "octo-org:main", "Removing legacy shim", None, 200, 100),
            vec![review("alice", at(1, 4))],
            vec![commit(at(1, 1))],
        ),
        // Wrong base branch and non-team author: both dropped.
        (
            pr(4, "alice", "octo-org:dev", "Add experiment", Some(at(2, 0)), 1, 1),
            vec![],
            vec![],
        ),
        (
            pr(5, "mallory", "octo-org:main", "Add backdoor", Some(at(2, 0)), 1, 1),
            vec![],
            vec![],
        ),
    ];
    Snapshot::ingest("Platform Team", team, prs)
}

#[test]
fn filtering_keeps_team_prs_on_main() {
    let snapshot = snapshot();
    let numbers: Vec<u64> = snapshot.entries.iter().map(|e| e.pr.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn derived_metadata_matches_worked_example() {
    let snapshot = snapshot();
    let meta = &snapshot.entries[0].meta;
    // Two commit-then-review cycles; the trailing review-review pair adds none.
    assert_eq!(meta.review_passes, 2);
    assert_eq!(meta.hours_to_merge, Some(24.0));
    assert_eq!(meta.total_changes, 100);
    let reviewers: Vec<&str> = meta.reviewers.iter().map(String::as_str).collect();
    assert_eq!(reviewers, vec!["carol", "dave"]);
}

#[test]
fn summary_covers_merged_prs_only() {
    let table = snapshot().summary_stats();
    assert_eq!(
        table.columns,
        vec!["name", "mean", "median", "p90", "min", "max"]
    );
    assert_eq!(table.len(), 4);
    // hours_to_merge over PRs 1 and 2: 24h and 6h.
    assert_eq!(table.rows[1][0], json!("hours_to_merge"));
    assert_eq!(table.rows[1][1], json!(15.0));
    assert_eq!(table.rows[1][4], json!(6.0));
    assert_eq!(table.rows[1][5], json!(24.0));
}

#[test]
fn every_chart_title_names_the_team() {
    let snapshot = snapshot();
    let reports = vec![
        snapshot.hours_to_merge_histogram(DEFAULT_MAX_HOURS, DEFAULT_HISTOGRAM_BINS),
        snapshot.hours_to_merge_by_author_box(DEFAULT_MAX_HOURS),
        snapshot.reviewer_pr_share_pie(),
        snapshot.reviewer_change_share_pie(),
        snapshot.author_change_share_pie(),
        snapshot.changes_reviewed_vs_created_scatter(),
        snapshot.title_verb_pie(DEFAULT_TOP_VERBS),
        snapshot.hours_to_merge_heatmap(DEFAULT_MAX_HOURS),
        snapshot.changes_vs_hours_scatter(DEFAULT_SCATTER_MAX_HOURS),
        snapshot.review_passes_by_author_box(),
        snapshot.review_passes_by_reviewer_box(),
    ];
    for report in reports {
        assert!(
            report.chart.title.contains("Platform Team"),
            "missing team name in {:?}",
            report.chart.title
        );
        for row in &report.table.rows {
            assert_eq!(row.len(), report.table.columns.len());
        }
    }
}

#[test]
fn title_verbs_count_all_valid_prs() {
    let report = snapshot().title_verb_pie(DEFAULT_TOP_VERBS);
    assert_eq!(report.chart.kind, ChartKind::Pie);
    // PR 3 is unmerged but still counted; tags and tenses are normalized.
    assert_eq!(
        report.table.rows,
        vec![
            vec![json!("add"), json!(1)],
            vec![json!("fix"), json!(1)],
            vec![json!("remove"), json!(1)],
        ],
    );
}

#[test]
fn reviewer_share_skips_outside_reviewers() {
    let report = snapshot().reviewer_pr_share_pie();
    // zed reviewed PR 2 but is not on the team.
    assert_eq!(
        report.table.rows,
        vec![
            vec![json!("alice"), json!(2)],
            vec![json!("carol"), json!(1)],
            vec![json!("dave"), json!(1)],
        ],
    );
}

#[test]
fn heatmap_spans_the_whole_roster() {
    let report = snapshot().hours_to_merge_heatmap(DEFAULT_MAX_HOURS);
    assert_eq!(report.chart.kind, ChartKind::Heatmap);
    assert_eq!(report.table.columns, vec!["author", "alice", "carol", "dave"]);
    assert_eq!(report.table.len(), 3);
    // alice -> carol observed at 24h; carol as author reviewed by alice at 6h.
    assert_eq!(report.table.rows[2][0], json!("alice"));
    assert_eq!(report.table.rows[2][2], json!(24.0));
    assert_eq!(report.table.rows[1][0], json!("carol"));
    assert_eq!(report.table.rows[1][1], json!(6.0));
    // dave merged nothing: a full row of the 0.0 default.
    assert_eq!(
        report.table.rows[0],
        vec![json!("dave"), json!(0.0), json!(0.0), json!(0.0)],
    );
}

#[test]
fn empty_snapshot_reports_are_empty_not_errors() {
    let empty = Snapshot::ingest("Platform Team", ["alice".to_string()], vec![]);
    assert!(empty.is_empty());
    assert!(empty.summary_stats().is_empty());
    assert!(empty
        .hours_to_merge_histogram(DEFAULT_MAX_HOURS, DEFAULT_HISTOGRAM_BINS)
        .table
        .is_empty());
    assert!(empty.reviewer_pr_share_pie().table.is_empty());
    let scatter = empty.changes_reviewed_vs_created_scatter();
    assert!(scatter.table.is_empty());
    assert_eq!(scatter.chart.reference_line.unwrap().x1, 0.0);
    // The heatmap still lays out the roster.
    let heatmap = empty.hours_to_merge_heatmap(DEFAULT_MAX_HOURS);
    assert_eq!(heatmap.table.columns, vec!["author", "alice"]);
    assert_eq!(heatmap.table.rows, vec![vec![json!("alice"), json!(0.0)]]);
}

#[test]
fn report_serialization_contract() {
    // Downstream chart renderers consume this JSON shape; breaking it breaks them.
    let report = snapshot().hours_to_merge_histogram(DEFAULT_MAX_HOURS, DEFAULT_HISTOGRAM_BINS);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["chart"]["kind"], "histogram");
    assert_eq!(json["chart"]["x"], "hours_to_merge");
    assert_eq!(json["chart"]["bins"], 40);
    assert!(json["chart"].get("y").is_none());
    assert_eq!(json["table"]["columns"][0], "hours_to_merge");

    let report = snapshot().changes_reviewed_vs_created_scatter();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["chart"]["kind"], "scatter");
    assert_eq!(json["chart"]["reference_line"]["x0"], 0.0);
}

#[tokio::test]
async fn download_propagates_upstream_failures() {
    // Point the client at a closed loopback port; the first fetch must fail
    // and abort the whole download.
    let octocrab = octocrab::Octocrab::builder()
        .base_uri("http://127.0.0.1:9")
        .unwrap()
        .build()
        .unwrap();
    let config = AnalyzerConfig::new(
        RepoId::parse("octo-org/widgets").unwrap(),
        "octo-org",
        "Platform Team",
        Some("test-token".to_string()),
    )
    .unwrap();
    let analyzer = PrAnalyzer::with_client(config, GitHubClient::from(octocrab));
    let result = analyzer.download().await;
    assert!(matches!(result, Err(AnalyzerError::Upstream(_))));
}
