use chrono::Duration;
use log::info;

use super::duration::non_negative;
use super::names::{BUILD_STAGE, PUBLISHING, VALIDATE};
use super::parallelization::EstimationStrategy;
use super::signing::{LegLogs, SigningPlan};
use super::stats::DurationSample;
use super::timeline::{Run, Timeline};
use crate::error::Result;
use crate::insights::{ParallelizationInsights, SeriesStats, SigningInsights};

/// Publishing has to fit in this window for a build to be promoted on time.
pub const PUBLISHING_BUDGET_MINUTES: i64 = 45;

/// A run together with everything fetched for it.
#[derive(Debug, Clone)]
pub struct RunData {
    pub run: Run,
    pub timeline: Timeline,
    /// Installer build logs; empty when only parallelization is analyzed
    pub leg_logs: LegLogs,
}

struct SigningRow {
    signing: Duration,
    validation: Duration,
    build_without_signing: Duration,
    publishing: Duration,
}

fn signing_row(data: &RunData) -> Result<SigningRow> {
    let signing = SigningPlan::from_timeline(&data.timeline)?.signing_duration(&data.leg_logs)?;
    let validation = data.timeline.require(&VALIDATE)?.duration()?;
    let publishing = data.timeline.require_any(&PUBLISHING)?.duration()?;

    let build_without_signing = non_negative(
        &format!("run {} without signing and validation", data.run.id),
        data.run.duration()? - (signing + validation),
    )?;

    Ok(SigningRow {
        signing,
        validation,
        build_without_signing,
        publishing,
    })
}

/// Summarizes signing time and the related promotion figures across `runs`.
///
/// # Errors
///
/// Any run that cannot be analyzed fails the whole batch, as does an empty batch.
pub fn analyze_signing(runs: &[RunData]) -> Result<SigningInsights> {
    let rows = runs.iter().map(signing_row).collect::<Result<Vec<_>>>()?;
    info!("Computed signing time for {} runs", rows.len());

    let series = |select: fn(&SigningRow) -> Duration| -> DurationSample {
        rows.iter().map(select).collect()
    };

    let signing = series(|row| row.signing);
    let validation = series(|row| row.validation);
    let promotion = series(|row| row.signing + row.validation);
    let build_without_signing = series(|row| row.build_without_signing);
    let publishing = series(|row| row.publishing);

    let mean_publishing = publishing.mean()?;

    Ok(SigningInsights {
        signing: SeriesStats::new("Time spent signing in the build", signing.summarize()?),
        validation: SeriesStats::new("Time spent validating", validation.summarize()?),
        promotion: SeriesStats::new("Time spent signing and validating", promotion.summarize()?),
        build_without_signing: SeriesStats::new(
            "Build time without signing/validation",
            build_without_signing.summarize()?,
        ),
        publishing: SeriesStats::new("Time spent publishing", publishing.summarize()?),
        publishing_budget_remaining: Duration::minutes(PUBLISHING_BUDGET_MINUTES) - mean_publishing,
        product_build_estimate: build_without_signing.mean()? - mean_publishing,
    })
}

/// Summarizes the current build stage duration and both speculative estimates across `runs`.
///
/// # Errors
///
/// Any run that cannot be analyzed fails the whole batch, as does an empty batch.
pub fn analyze_parallelization(runs: &[RunData]) -> Result<ParallelizationInsights> {
    let current_build = runs
        .iter()
        .map(|data| data.timeline.require(&BUILD_STAGE)?.duration())
        .collect::<Result<Vec<_>>>()?;

    let estimates = |strategy: EstimationStrategy| -> Result<SeriesStats> {
        let sample = runs
            .iter()
            .map(|data| strategy.estimate(&data.timeline))
            .collect::<Result<Vec<_>>>()?;
        Ok(SeriesStats::new(
            strategy.label(),
            DurationSample::new(sample).summarize()?,
        ))
    };

    let insights = ParallelizationInsights {
        current_build: SeriesStats::new(
            "Current product build times (including incremental signing steps)",
            DurationSample::new(current_build).summarize()?,
        ),
        fixed_category: estimates(EstimationStrategy::FixedCategory)?,
        inferred_platform: estimates(EstimationStrategy::InferredPlatform)?,
    };

    info!("Computed parallelization estimates for {} runs", runs.len());
    Ok(insights)
}
