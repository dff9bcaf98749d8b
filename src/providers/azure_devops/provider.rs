use chrono::Utc;
use futures::future::try_join_all;
use log::{debug, info};

use super::client::AzureDevOpsClient;
use crate::analysis::{analyze_parallelization, analyze_signing, LegLogs, Run, RunData, SigningPlan};
use crate::auth::Token;
use crate::error::Result;
use crate::insights::RunInsights;
use crate::output::PhaseProgress;

/// Which reports to compute for a batch of runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Signing,
    Parallelization,
    All,
}

impl AnalysisKind {
    fn includes_signing(self) -> bool {
        matches!(self, Self::Signing | Self::All)
    }

    fn includes_parallelization(self) -> bool {
        matches!(self, Self::Parallelization | Self::All)
    }
}

pub struct AzureDevOpsProvider {
    pub client: AzureDevOpsClient,
    pub org_url: String,
    pub project: String,
}

impl AzureDevOpsProvider {
    pub fn new(org_url: &str, project: String, token: Option<Token>) -> Result<Self> {
        let client = AzureDevOpsClient::new(org_url, token)?;

        Ok(Self {
            client,
            org_url: org_url.to_string(),
            project,
        })
    }

    /// Fetches the last `limit` successful runs of `definition` on `branch` and analyzes them.
    ///
    /// # Errors
    ///
    /// Any fetch or analysis failure for any run fails the whole batch.
    pub async fn collect_insights(
        &self,
        definition: &str,
        branch: &str,
        limit: usize,
        kind: AnalysisKind,
    ) -> Result<RunInsights> {
        info!(
            "Analyzing up to {limit} runs of '{definition}' on {branch} in {}",
            self.project
        );

        let progress = PhaseProgress::start_fetching_runs();
        let definition_ids = self
            .client
            .fetch_definition_ids(&self.project, definition)
            .await?;
        let runs = self
            .client
            .fetch_runs(&self.project, &definition_ids, branch, limit)
            .await?;
        info!("Found {} runs", runs.len());

        let progress = progress.finish_runs_start_timelines(runs.len());
        let run_data = try_join_all(
            runs.into_iter()
                .map(|run| self.fetch_run_data(run, kind.includes_signing())),
        )
        .await?;

        let progress = progress.finish_timelines_start_analysis();
        let signing = if kind.includes_signing() {
            Some(analyze_signing(&run_data)?)
        } else {
            None
        };
        let parallelization = if kind.includes_parallelization() {
            Some(analyze_parallelization(&run_data)?)
        } else {
            None
        };
        progress.finish_analysis();

        Ok(RunInsights {
            provider: "Azure DevOps".to_string(),
            organization: self.org_url.clone(),
            project: self.project.clone(),
            definition: definition.to_string(),
            branch: branch.to_string(),
            collected_at: Utc::now(),
            total_runs: run_data.len(),
            signing,
            parallelization,
        })
    }

    /// Timeline of `run`, plus its installer build logs when `with_logs` is set.
    async fn fetch_run_data(&self, run: Run, with_logs: bool) -> Result<RunData> {
        let timeline = self.client.fetch_timeline(&self.project, run.id).await?;

        let leg_logs = if with_logs {
            let log_ids = SigningPlan::from_timeline(&timeline)?.log_ids()?;
            self.fetch_leg_logs(run.id, &log_ids).await?
        } else {
            LegLogs::new()
        };

        debug!(
            "Run {}: {} timeline records, {} installer logs",
            run.id,
            timeline.records().len(),
            leg_logs.len()
        );

        Ok(RunData {
            run,
            timeline,
            leg_logs,
        })
    }

    async fn fetch_leg_logs(&self, run_id: u64, log_ids: &[u64]) -> Result<LegLogs> {
        let logs = try_join_all(log_ids.iter().map(|&log_id| async move {
            let lines = self
                .client
                .fetch_log_lines(&self.project, run_id, log_id)
                .await?;
            Ok::<_, crate::error::RunLensError>((log_id, lines))
        }))
        .await?;

        Ok(logs.into_iter().collect())
    }
}
