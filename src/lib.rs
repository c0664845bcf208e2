//! Pull-request analytics for a GitHub team.
//!
//! Fetches every pull request of one repository, keeps those authored by
//! members of a configured organization team against the main branch, derives
//! per-PR metrics (reviewer set, review passes, hours to merge, change
//! volume), and exposes a family of reporting operations that return
//! chart-ready tables plus declarative chart specifications. Rendering and
//! persistence are out of scope; this crate is meant to be driven
//! programmatically, e.g. from an analysis session:
//!
//! ```no_run
//! use pr_analytics::{AnalyzerConfig, PrAnalyzer, RepoId};
//! use pr_analytics::report::{DEFAULT_HISTOGRAM_BINS, DEFAULT_MAX_HOURS};
//!
//! # async fn run() -> Result<(), pr_analytics::AnalyzerError> {
//! let config = AnalyzerConfig::new(
//!     RepoId::parse("octo-org/widgets").unwrap(),
//!     "octo-org",
//!     "Platform Team",
//!     None, // falls back to GITHUB_API_TOKEN
//! )?;
//! let snapshot = PrAnalyzer::new(config)?.download().await?;
//!
//! let summary = snapshot.summary_stats();
//! println!("{}", serde_json::to_string_pretty(&summary).unwrap());
//!
//! let histogram = snapshot.hours_to_merge_histogram(DEFAULT_MAX_HOURS, DEFAULT_HISTOGRAM_BINS);
//! println!("{}", serde_json::to_string_pretty(&histogram).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;
pub mod report;

pub use analyzer::{AnalyzedPr, PrAnalyzer, Snapshot};
pub use config::{AnalyzerConfig, RepoId};
pub use error::AnalyzerError;
pub use github::{GitHubClient, PrCommit, PullRequest, Review};
pub use metrics::PrMetadata;
pub use report::{ChartKind, ChartSpec, Report, Table};
