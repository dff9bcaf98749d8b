use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunLensError {
    #[error("Record '{record}' is missing a start or finish time")]
    MissingTimestamp { record: String },

    #[error("Record '{record}' finishes before it starts")]
    NegativeDuration { record: String },

    #[error("Required {record_type} record '{name}' not found in timeline")]
    RequiredRecordMissing { name: String, record_type: String },

    #[error("Record '{record}' has no log attached")]
    MissingLog { record: String },

    #[error("Invalid duration literal: {0}")]
    InvalidDurationLiteral(String),

    #[error("Cannot compute statistics over an empty sample")]
    EmptySample,

    #[error("Pipeline definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Azure DevOps API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Azure DevOps API error (status {status}) after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunLensError {
    pub(crate) fn required(name: &str, record_type: &str) -> Self {
        Self::RequiredRecordMissing {
            name: name.to_string(),
            record_type: record_type.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunLensError>;
