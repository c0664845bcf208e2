//! Aggregation and chart-specification generation.
//!
//! Every reporting operation is a pure read over a [`Snapshot`] and returns a
//! [`Report`]: a declarative [`ChartSpec`] (chart kind plus column bindings;
//! rendering is the caller's concern) and the [`Table`] backing it. Group-by
//! keys iterate in sorted order, so output is deterministic for a given
//! snapshot. Empty inputs produce well-typed empty tables, never errors, and
//! one report failing to find rows has no effect on any other.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::analyzer::Snapshot;
use crate::metrics::{self, PrMetadata};

/// Default ceiling applied to hours-to-merge before aggregation.
pub const DEFAULT_MAX_HOURS: f64 = 120.0;
/// Default (looser) ceiling for the changes-vs-hours scatter.
pub const DEFAULT_SCATTER_MAX_HOURS: f64 = 500.0;
/// Default bin count for the hours-to-merge histogram.
pub const DEFAULT_HISTOGRAM_BINS: usize = 40;
/// Default number of title verbs to keep.
pub const DEFAULT_TOP_VERBS: usize = 10;

/// Chart-ready tabular projection: named columns plus row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Histogram,
    Box,
    Pie,
    Scatter,
    Heatmap,
}

/// Diagonal or arbitrary line overlaid on a scatter, in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Declarative chart description. `x`/`y`/`color` name columns of the
/// accompanying table (for heatmaps, the axis dimensions); `values`/`names`
/// are the pie bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    /// Always embeds the team name.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_line: Option<ReferenceLine>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: String) -> Self {
        Self {
            kind,
            title,
            x: None,
            y: None,
            color: None,
            values: None,
            names: None,
            bins: None,
            color_label: None,
            reference_line: None,
        }
    }
}

/// A chart specification together with the table that backs it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub chart: ChartSpec,
    pub table: Table,
}

/// Arithmetic mean; 0.0 on empty input.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Linear-interpolation quantile over the order statistics; 0.0 on empty
/// input. `quantile(xs, 0.5)` is the median.
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl Snapshot {
    fn title(&self, label: &str) -> String {
        format!("{} ({})", label, self.team_name)
    }

    /// Reviewers of one PR restricted to current team members. Non-team
    /// reviewers stay in the raw metadata but never reach reviewer-indexed
    /// aggregates.
    fn team_reviewers<'a>(&'a self, meta: &'a PrMetadata) -> impl Iterator<Item = &'a str> {
        meta.reviewers
            .iter()
            .map(String::as_str)
            .filter(|reviewer| self.members.contains(*reviewer))
    }

    fn changes_by_author(&self) -> BTreeMap<&str, u64> {
        let mut changes = BTreeMap::new();
        for entry in &self.entries {
            *changes.entry(entry.pr.author.as_str()).or_insert(0) += entry.meta.total_changes;
        }
        changes
    }

    fn changes_by_reviewer(&self) -> BTreeMap<&str, u64> {
        let mut changes = BTreeMap::new();
        for entry in &self.entries {
            for reviewer in self.team_reviewers(&entry.meta) {
                *changes.entry(reviewer).or_insert(0) += entry.meta.total_changes;
            }
        }
        changes
    }

    fn pie_report(&self, label: &str, names: &str, values: &str, data: Vec<(&str, u64)>) -> Report {
        let mut table = Table::new([names, values]);
        for (name, value) in data {
            table.push(vec![json!(name), json!(value)]);
        }
        let mut chart = ChartSpec::new(ChartKind::Pie, self.title(label));
        chart.values = Some(values.to_string());
        chart.names = Some(names.to_string());
        Report { chart, table }
    }

    /// Mean/median/p90/min/max of review passes, merge latency, change volume
    /// and reviewer count over merged PRs. Empty merged set yields a zero-row
    /// table and a warning.
    pub fn summary_stats(&self) -> Table {
        let mut table = Table::new(["name", "mean", "median", "p90", "min", "max"]);
        let samples: Vec<[f64; 4]> = self
            .merged()
            .map(|entry| {
                [
                    entry.meta.review_passes as f64,
                    entry.meta.hours_to_merge.unwrap_or(0.0),
                    entry.meta.total_changes as f64,
                    entry.meta.reviewers.len() as f64,
                ]
            })
            .collect();
        if samples.is_empty() {
            tracing::warn!("no merged pull requests; summary statistics are empty");
            return table;
        }
        let names = ["review_passes", "hours_to_merge", "total_changes", "num_reviewers"];
        for (idx, name) in names.iter().enumerate() {
            let xs: Vec<f64> = samples.iter().map(|row| row[idx]).collect();
            let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            table.push(vec![
                json!(name),
                json!(mean(&xs)),
                json!(quantile(&xs, 0.5)),
                json!(quantile(&xs, 0.9)),
                json!(min),
                json!(max),
            ]);
        }
        table
    }

    /// Distribution of hours-to-merge over merged PRs, capped at `max_hours`.
    pub fn hours_to_merge_histogram(&self, max_hours: f64, bins: usize) -> Report {
        let mut table = Table::new(["hours_to_merge"]);
        for entry in self.merged() {
            if let Some(hours) = entry.meta.hours_to_merge {
                table.push(vec![json!(hours.min(max_hours))]);
            }
        }
        let mut chart = ChartSpec::new(ChartKind::Histogram, self.title("PR Hours To Merge"));
        chart.x = Some("hours_to_merge".to_string());
        chart.bins = Some(bins);
        Report { chart, table }
    }

    /// Hours-to-merge split by author, capped at `max_hours`.
    pub fn hours_to_merge_by_author_box(&self, max_hours: f64) -> Report {
        let mut table = Table::new(["hours_to_merge", "user"]);
        for entry in self.merged() {
            if let Some(hours) = entry.meta.hours_to_merge {
                table.push(vec![json!(hours.min(max_hours)), json!(entry.pr.author)]);
            }
        }
        let mut chart = ChartSpec::new(ChartKind::Box, self.title("PR Hours To Merge By Author"));
        chart.x = Some("hours_to_merge".to_string());
        chart.color = Some("user".to_string());
        Report { chart, table }
    }

    /// Share of PRs each team-member reviewer was involved in, all valid PRs.
    pub fn reviewer_pr_share_pie(&self) -> Report {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for entry in &self.entries {
            for reviewer in self.team_reviewers(&entry.meta) {
                *counts.entry(reviewer).or_insert(0) += 1;
            }
        }
        self.pie_report(
            "PRs Assigned To Reviewers",
            "reviewer",
            "prs",
            counts.into_iter().collect(),
        )
    }

    /// Share of changed lines each team-member reviewer was involved in.
    pub fn reviewer_change_share_pie(&self) -> Report {
        self.pie_report(
            "PR Changes Assigned To Reviewers",
            "reviewer",
            "changes",
            self.changes_by_reviewer().into_iter().collect(),
        )
    }

    /// Share of changed lines each author created.
    pub fn author_change_share_pie(&self) -> Report {
        self.pie_report(
            "PR Changes By Author",
            "author",
            "changes",
            self.changes_by_author().into_iter().collect(),
        )
    }

    /// Per-user changes reviewed vs changes created, with a y=x reference
    /// diagonal spanning 0 to the larger axis maximum. Users missing one side
    /// read as 0 on that side.
    pub fn changes_reviewed_vs_created_scatter(&self) -> Report {
        let created = self.changes_by_author();
        let reviewed = self.changes_by_reviewer();
        let users: BTreeSet<&str> = created.keys().chain(reviewed.keys()).copied().collect();

        let mut table = Table::new(["user", "changes_reviewed", "changes_created"]);
        let mut max_val: u64 = 0;
        for user in users {
            let reviewed = reviewed.get(user).copied().unwrap_or(0);
            let created = created.get(user).copied().unwrap_or(0);
            max_val = max_val.max(reviewed).max(created);
            table.push(vec![json!(user), json!(reviewed), json!(created)]);
        }

        let mut chart = ChartSpec::new(
            ChartKind::Scatter,
            self.title("PR Changes Reviewed vs Created"),
        );
        chart.x = Some("changes_reviewed".to_string());
        chart.y = Some("changes_created".to_string());
        chart.color = Some("user".to_string());
        chart.reference_line = Some(ReferenceLine {
            x0: 0.0,
            y0: 0.0,
            x1: max_val as f64,
            y1: max_val as f64,
        });
        Report { chart, table }
    }

    /// Top-n normalized title verbs over all valid PRs, merged or not.
    /// Equal counts are ordered by verb for determinism.
    pub fn title_verb_pie(&self, n: usize) -> Report {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(metrics::title_verb(&entry.pr.title)).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        self.pie_report(
            "PR Title Verbs",
            "word",
            "cnt",
            ranked.iter().map(|(word, cnt)| (word.as_str(), *cnt)).collect(),
        )
    }

    /// Author×reviewer mean hours-to-merge over merged PRs, team members only.
    /// Rows are authors (descending login), columns reviewers (ascending).
    /// Pairs never observed among merged PRs read as 0.0, not as missing.
    pub fn hours_to_merge_heatmap(&self, max_hours: f64) -> Report {
        let mut samples: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
        for entry in self.merged() {
            let Some(hours) = entry.meta.hours_to_merge else {
                continue;
            };
            for reviewer in self.team_reviewers(&entry.meta) {
                samples
                    .entry((entry.pr.author.as_str(), reviewer))
                    .or_default()
                    .push(hours.min(max_hours));
            }
        }

        let reviewers: Vec<&str> = self.members.iter().map(String::as_str).collect();
        let mut table = Table::new(
            std::iter::once("author".to_string())
                .chain(reviewers.iter().map(|reviewer| reviewer.to_string())),
        );
        for &author in reviewers.iter().rev() {
            let mut row = vec![json!(author)];
            for &reviewer in &reviewers {
                let cell = samples
                    .get(&(author, reviewer))
                    .map(|hours| mean(hours))
                    .unwrap_or(0.0);
                row.push(json!(cell));
            }
            table.push(row);
        }

        let mut chart = ChartSpec::new(ChartKind::Heatmap, self.title("PR Hours To Merge Heatmap"));
        chart.x = Some("reviewer".to_string());
        chart.y = Some("author".to_string());
        chart.color_label = Some("Mean Hours To Merge".to_string());
        Report { chart, table }
    }

    /// Hours-to-merge (capped, default 500) against total changed lines,
    /// colored by author, merged PRs only.
    pub fn changes_vs_hours_scatter(&self, max_hours: f64) -> Report {
        let mut table = Table::new(["total_changes", "hours_to_merge", "author"]);
        for entry in self.merged() {
            if let Some(hours) = entry.meta.hours_to_merge {
                table.push(vec![
                    json!(entry.meta.total_changes),
                    json!(hours.min(max_hours)),
                    json!(entry.pr.author),
                ]);
            }
        }
        let mut chart = ChartSpec::new(
            ChartKind::Scatter,
            self.title("PR Hours To Merge vs Total Changes"),
        );
        chart.x = Some("total_changes".to_string());
        chart.y = Some("hours_to_merge".to_string());
        chart.color = Some("author".to_string());
        Report { chart, table }
    }

    /// Review-pass distribution per author, merged PRs only.
    pub fn review_passes_by_author_box(&self) -> Report {
        let mut table = Table::new(["review_passes", "author"]);
        for entry in self.merged() {
            table.push(vec![json!(entry.meta.review_passes), json!(entry.pr.author)]);
        }
        let mut chart = ChartSpec::new(ChartKind::Box, self.title("Review Passes By Author"));
        chart.x = Some("review_passes".to_string());
        chart.color = Some("author".to_string());
        Report { chart, table }
    }

    /// Review-pass distribution per team-member reviewer: one row for every
    /// (merged PR, reviewer) pair.
    pub fn review_passes_by_reviewer_box(&self) -> Report {
        let mut table = Table::new(["review_passes", "reviewer"]);
        for entry in self.merged() {
            for reviewer in self.team_reviewers(&entry.meta) {
                table.push(vec![json!(entry.meta.review_passes), json!(reviewer)]);
            }
        }
        let mut chart = ChartSpec::new(ChartKind::Box, self.title("PR Review Passes By Reviewer"));
        chart.x = Some("review_passes".to_string());
        chart.color = Some("reviewer".to_string());
        Report { chart, table }
    }
}
