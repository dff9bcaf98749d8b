use std::sync::OnceLock;

use chrono::Duration;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;

use super::duration::{format_duration, max_record_duration};
use super::names::{INSTALLER_BUILD_AND_TEST, RUNTIME_LIBRARIES_WAVE};
use super::timeline::{Record, Timeline};
use crate::error::{RunLensError, Result};

/// How build jobs are grouped when estimating a fully parallel build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationStrategy {
    /// Runtime and libraries legs form one wave, installer legs a second one.
    FixedCategory,
    /// Each platform's legs run in sequence; platforms run in parallel.
    InferredPlatform,
}

impl EstimationStrategy {
    pub fn label(self) -> &'static str {
        match self {
            Self::FixedCategory => "Likely best parallelization with current manifest generation",
            Self::InferredPlatform => "Likely best parallelization with generated manifest",
        }
    }

    /// Hypothetical minimal duration of the run's build phase.
    pub fn estimate(self, timeline: &Timeline) -> Result<Duration> {
        let estimate = match self {
            Self::FixedCategory => estimate_fixed_category(timeline),
            Self::InferredPlatform => estimate_inferred_platform(timeline),
        }?;

        debug!("{:?} estimate: {}", self, format_duration(estimate));
        Ok(estimate)
    }
}

/// Slowest runtime/libraries leg plus slowest installer leg.
///
/// Every record is considered regardless of its type, matched only by name prefix.
pub fn estimate_fixed_category(timeline: &Timeline) -> Result<Duration> {
    let runtime_libraries = RUNTIME_LIBRARIES_WAVE
        .into_iter()
        .flat_map(|prefix| timeline.with_prefix(prefix));
    let runtime_libraries_time = max_record_duration(runtime_libraries)?
        .ok_or_else(|| RunLensError::required(&RUNTIME_LIBRARIES_WAVE.join(" | "), "any"))?;

    let installer_time = max_record_duration(timeline.with_prefix(INSTALLER_BUILD_AND_TEST))?
        .ok_or_else(|| RunLensError::required(INSTALLER_BUILD_AND_TEST, "any"))?;

    Ok(runtime_libraries_time + installer_time)
}

/// Slowest platform, where each platform takes its slowest build job plus its installer job.
///
/// Jobs whose name carries no platform are left out.
pub fn estimate_inferred_platform(timeline: &Timeline) -> Result<Duration> {
    let mut platforms: IndexMap<String, Vec<&Record>> = IndexMap::new();
    for record in timeline.records().iter().filter(|record| record.is_job()) {
        if let Some(platform) = platform_key(&record.name) {
            platforms.entry(platform).or_default().push(record);
        }
    }

    let mut slowest: Option<Duration> = None;
    for (platform, jobs) in &platforms {
        let installer = jobs
            .iter()
            .position(|job| job.name.starts_with(INSTALLER_BUILD_AND_TEST));

        let builds = jobs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != installer)
            .map(|(_, job)| *job);

        let build_time = max_record_duration(builds)?.unwrap_or_else(Duration::zero);
        let installer_time = installer
            .map(|i| jobs[i].duration())
            .transpose()?
            .unwrap_or_else(Duration::zero);

        let total = build_time + installer_time;
        debug!("Platform '{platform}': {}", format_duration(total));

        slowest = Some(slowest.map_or(total, |slowest| slowest.max(total)));
    }

    slowest.ok_or_else(|| RunLensError::required("platform job", "Job"))
}

fn platform_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(Windows NT|Linux( musl)?|OSX|iOS) (x86|x64|arm|arm64) ")
            .expect("platform pattern is valid")
    })
}

/// Operating system and architecture named in a job's display name, e.g. "Linux musl arm64".
///
/// Underscores count as spaces, and the architecture must be followed by a space.
pub fn platform_key(job_name: &str) -> Option<String> {
    let normalized = job_name.replace('_', " ");
    platform_pattern()
        .find(&normalized)
        .map(|found| found.as_str().trim_end().to_string())
}
