use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::{Config, OutputFormat};
use crate::output::{export_json, print_summary};
use crate::providers::{AnalysisKind, AzureDevOpsProvider};

#[derive(Parser)]
#[command(name = "runlens")]
#[command(
    author,
    version,
    about = "Signing time and build parallelization statistics for Azure Pipelines",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to runlens.{toml,json,yaml,yml} in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Organization URL
    #[arg(long, global = true)]
    org_url: Option<String>,

    #[arg(short = 'P', long, global = true)]
    project: Option<String>,

    /// Build definition name
    #[arg(short, long, global = true)]
    definition: Option<String>,

    /// Fully qualified branch ref
    #[arg(short, long, global = true)]
    branch: Option<String>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Time spent signing, validating and publishing
    Signing(RunArgs),
    /// Build stage duration against speculative parallel schedules
    Parallelization(RunArgs),
    /// Both reports over the same runs
    All(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Azure DevOps personal access token
    token: String,

    /// Number of most recent successful runs to analyze
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    count: u16,
}

/// Settings after merging flags over the config file over defaults.
#[derive(Debug)]
struct Settings {
    org_url: String,
    project: String,
    definition: String,
    branch: String,
    format: OutputFormat,
    pretty: bool,
}

impl Cli {
    fn settings(&self, config: Config) -> Settings {
        let azure = config.azure_devops;
        Settings {
            org_url: self.org_url.clone().unwrap_or(azure.org_url),
            project: self.project.clone().unwrap_or(azure.project),
            definition: self.definition.clone().unwrap_or(azure.definition),
            branch: self.branch.clone().unwrap_or(azure.branch),
            format: self.format.unwrap_or(config.output.format),
            pretty: self.pretty || config.output.pretty,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let (kind, args) = match &self.command {
            Commands::Signing(args) => (AnalysisKind::Signing, args),
            Commands::Parallelization(args) => (AnalysisKind::Parallelization, args),
            Commands::All(args) => (AnalysisKind::All, args),
        };

        let config = Config::load(self.config.as_deref())?;
        let settings = self.settings(config);
        info!("Collecting {kind:?} insights with {settings:?}");

        let provider = AzureDevOpsProvider::new(
            &settings.org_url,
            settings.project.clone(),
            Some(Token::from(args.token.as_str())),
        )?;

        let insights = provider
            .collect_insights(
                &settings.definition,
                &settings.branch,
                usize::from(args.count),
                kind,
            )
            .await
            .context("Failed to collect run insights")?;

        match (settings.format, &self.output) {
            (OutputFormat::Summary, _) => print_summary(&insights),
            (OutputFormat::Json, Some(output_path)) => {
                let file = File::create(output_path).with_context(|| {
                    format!("Failed to create output file: {}", output_path.display())
                })?;
                export_json(&insights, settings.pretty, &mut BufWriter::new(file))?;
                info!("Insights written to: {}", output_path.display());
            }
            (OutputFormat::Json, None) => {
                export_json(&insights, settings.pretty, &mut std::io::stdout().lock())?;
            }
        }

        Ok(())
    }
}
