use std::collections::HashMap;

use chrono::Duration;
use log::{debug, warn};

use super::duration::format_duration;
use super::leg_log::log_leg_total;
use super::names::{
    INSTALLER_BUILD_AND_TEST, INSTALLER_BUILD_STEP, PREPARE_SIGNED_ARTIFACTS, SIGNING_VALIDATION,
};
use super::timeline::{Record, Timeline};
use crate::error::{RunLensError, Result};

/// Log text keyed by log identifier, as fetched for one run.
pub type LegLogs = HashMap<u64, Vec<String>>;

/// The records of one timeline that contribute to its signing time.
///
/// Building the plan only inspects the timeline; the installer build logs it
/// names must be fetched before [`SigningPlan::signing_duration`] can run.
#[derive(Debug)]
pub struct SigningPlan<'a> {
    pub prepare_signed_artifacts: &'a Record,
    pub signing_validation: &'a Record,
    /// "Build" steps of the installer leg jobs, one per platform
    pub installer_builds: Vec<&'a Record>,
}

impl<'a> SigningPlan<'a> {
    /// Locates the signing-related records in `timeline`.
    ///
    /// # Errors
    ///
    /// Returns `RequiredRecordMissing` if either the "Prepare Signed Artifacts"
    /// or the "Signing Validation" job is absent.
    pub fn from_timeline(timeline: &'a Timeline) -> Result<Self> {
        let prepare_signed_artifacts = timeline.require(&PREPARE_SIGNED_ARTIFACTS)?;

        let installer_jobs: Vec<&Record> = timeline
            .with_prefix(INSTALLER_BUILD_AND_TEST)
            .filter(|record| record.is_job())
            .collect();

        let installer_builds: Vec<&Record> = timeline
            .records()
            .iter()
            .filter(|record| record.matches(&INSTALLER_BUILD_STEP))
            .filter(|record| {
                timeline.parent(record).is_some_and(|parent| {
                    installer_jobs.iter().any(|job| std::ptr::eq(*job, parent))
                })
            })
            .collect();

        for job in &installer_jobs {
            if !installer_builds
                .iter()
                .any(|build| build.parent_id.as_deref() == Some(job.id.as_str()))
            {
                warn!("Installer job '{}' has no '{}' step", job.name, INSTALLER_BUILD_STEP.name);
            }
        }

        let signing_validation = timeline.require(&SIGNING_VALIDATION)?;

        Ok(Self {
            prepare_signed_artifacts,
            signing_validation,
            installer_builds,
        })
    }

    /// Identifiers of the logs that must be fetched for this plan.
    ///
    /// # Errors
    ///
    /// Returns `MissingLog` if an installer build step has no log attached.
    pub fn log_ids(&self) -> Result<Vec<u64>> {
        self.installer_builds
            .iter()
            .map(|build| Self::log_id_of(build))
            .collect()
    }

    fn log_id_of(build: &Record) -> Result<u64> {
        build.log_id.ok_or_else(|| RunLensError::MissingLog {
            record: build.id.clone(),
        })
    }

    /// Leg time of the slowest installer leg, zero when there are no legs.
    pub fn slowest_installer_leg(&self, logs: &LegLogs) -> Result<Duration> {
        let mut slowest = Duration::zero();

        for build in &self.installer_builds {
            let log_id = Self::log_id_of(build)?;
            let lines = logs.get(&log_id).ok_or_else(|| RunLensError::MissingLog {
                record: build.id.clone(),
            })?;

            let leg_time = log_leg_total(lines)?;
            debug!(
                "Installer build {} spent {} in signing legs",
                build.id,
                format_duration(leg_time)
            );
            slowest = slowest.max(leg_time);
        }

        if !self.installer_builds.is_empty() && slowest == Duration::zero() {
            warn!(
                "No '-> completed in' lines found in {} installer build logs",
                self.installer_builds.len()
            );
        }

        Ok(slowest)
    }

    /// Total signing time of the run: both signing jobs plus the slowest installer leg.
    pub fn signing_duration(&self, logs: &LegLogs) -> Result<Duration> {
        let prepare = self.prepare_signed_artifacts.duration()?;
        let validation = self.signing_validation.duration()?;
        let legs = self.slowest_installer_leg(logs)?;

        Ok(prepare + validation + legs)
    }
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::LegLogs;
    use crate::analysis::timeline::test_support::{job, record};
    use crate::analysis::timeline::{RecordType, Timeline};

    /// A timeline with both signing jobs and two installer legs whose build
    /// steps log to 101 and 102.
    pub fn signing_timeline() -> Timeline {
        let mut linux_build = record("b1", Some("i1"), "Build", RecordType::Task, 100, 400);
        linux_build.log_id = Some(101);
        let mut windows_build = record("b2", Some("i2"), "Build", RecordType::Task, 100, 500);
        windows_build.log_id = Some(102);

        Timeline::new(vec![
            job("p1", "Prepare Signed Artifacts", 0, 600),
            job("i1", "Installer Build and Test Linux_x64 Release", 0, 900),
            linux_build,
            job("i2", "Installer Build and Test Windows_NT_x64 Release", 0, 1_200),
            windows_build,
            job("v1", "Signing Validation", 1_300, 1_600),
        ])
    }

    pub fn signing_logs() -> LegLogs {
        LegLogs::from([
            (
                101,
                vec![
                    "a -> completed in 0:01:30".to_string(),
                    "b -> completed in 0:02:00".to_string(),
                ],
            ),
            (
                102,
                vec![
                    "noise".to_string(),
                    "c -> completed in 0:05:00".to_string(),
                ],
            ),
        ])
    }
}
