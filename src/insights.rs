use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::analysis::duration::serialize_seconds;
use crate::analysis::DurationStats;

/// Everything collected for one batch of runs.
#[derive(Debug, Serialize)]
pub struct RunInsights {
    pub provider: String,
    pub organization: String,
    pub project: String,
    pub definition: String,
    pub branch: String,
    pub collected_at: DateTime<Utc>,
    pub total_runs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningInsights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelization: Option<ParallelizationInsights>,
}

/// Statistics of one per-run series, with the heading it is reported under.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesStats {
    pub label: String,
    pub stats: DurationStats,
}

impl SeriesStats {
    pub fn new(label: impl Into<String>, stats: DurationStats) -> Self {
        Self {
            label: label.into(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SigningInsights {
    /// Time spent signing in each run
    pub signing: SeriesStats,
    /// Time spent in the "Validate" job
    pub validation: SeriesStats,
    /// Signing plus validation
    pub promotion: SeriesStats,
    /// Run duration minus signing and validation
    pub build_without_signing: SeriesStats,
    pub publishing: SeriesStats,
    /// Publishing budget left after the mean publishing time, negative when over budget
    #[serde(serialize_with = "serialize_seconds")]
    pub publishing_budget_remaining: Duration,
    /// Mean build time without signing, validation or publishing
    #[serde(serialize_with = "serialize_seconds")]
    pub product_build_estimate: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParallelizationInsights {
    /// Duration of the "Build" stage as actually scheduled
    pub current_build: SeriesStats,
    pub fixed_category: SeriesStats,
    pub inferred_platform: SeriesStats,
}
