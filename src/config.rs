use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CANDIDATES: [&str; 4] = ["runlens.toml", "runlens.json", "runlens.yaml", "runlens.yml"];

/// Configuration file structure for `RunLens`.
///
/// Every value can be overridden on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureDevOpsConfig {
    /// Organization URL (e.g., 'https://dev.azure.com/dnceng')
    #[serde(default = "default_org_url")]
    pub org_url: String,

    #[serde(default = "default_project")]
    pub project: String,

    /// Build definition name
    #[serde(default = "default_definition")]
    pub definition: String,

    /// Fully qualified branch ref
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tables on the terminal
    #[default]
    Summary,
    Json,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            org_url: default_org_url(),
            project: default_project(),
            definition: default_definition(),
            branch: default_branch(),
        }
    }
}

fn default_org_url() -> String {
    "https://dev.azure.com/dnceng".to_string()
}

fn default_project() -> String {
    "internal".to_string()
}

fn default_definition() -> String {
    "dotnet-runtime-official".to_string()
}

fn default_branch() -> String {
    "refs/heads/master".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Uses `path` when given, otherwise the first of `runlens.toml`,
    /// `runlens.json`, `runlens.yaml` and `runlens.yml` found in the
    /// current directory. Returns the defaults when there is no file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        Self::load_from_dir(Path::new("."))
    }

    fn load_from_dir(dir: &Path) -> Result<Self> {
        for candidate in CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                log::debug!("Loading configuration from {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
