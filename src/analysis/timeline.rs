use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::Serialize;

use super::duration;
use super::names::RecordKey;
use crate::error::{RunLensError, Result};

/// One completed pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    /// Build identifier
    pub id: u64,
    /// Name of the project owning the build
    pub project: String,
    /// Source branch (e.g., "refs/heads/master")
    pub branch: String,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    /// Build status (e.g., "completed")
    pub status: String,
    /// Build result (e.g., "succeeded")
    pub result: Option<String>,
}

impl Run {
    /// Wall-clock time between the run's start and finish.
    pub fn duration(&self) -> Result<Duration> {
        duration::elapsed(&format!("run {}", self.id), self.start_time, self.finish_time)
    }
}

/// Kind of a timeline record. The upstream set is open, so unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    Stage,
    Phase,
    Job,
    Task,
    Checkpoint,
    Other(String),
}

impl RecordType {
    pub fn parse(value: &str) -> Self {
        match value {
            "Stage" => Self::Stage,
            "Phase" => Self::Phase,
            "Job" => Self::Job,
            "Task" => Self::Task,
            "Checkpoint" => Self::Checkpoint,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stage => "Stage",
            Self::Phase => "Phase",
            Self::Job => "Job",
            Self::Task => "Task",
            Self::Checkpoint => "Checkpoint",
            Self::Other(other) => other,
        }
    }
}

/// A named, timed node in a run's execution tree.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub record_type: RecordType,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    /// Identifier of the log attached to this record, if any
    pub log_id: Option<u64>,
}

impl Record {
    pub fn duration(&self) -> Result<Duration> {
        duration::record_duration(self)
    }

    pub fn matches(&self, key: &RecordKey) -> bool {
        self.name == key.name
            && key
                .record_type
                .as_ref()
                .map_or(true, |record_type| &self.record_type == record_type)
    }

    pub fn is_job(&self) -> bool {
        self.record_type == RecordType::Job
    }
}

/// The recorded tree of one run.
///
/// Records are kept in upstream order in an arena; parent links are resolved
/// through an identifier index rather than references between records.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl Timeline {
    pub fn new(records: Vec<Record>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();

        Self { records, index }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn parent(&self, record: &Record) -> Option<&Record> {
        record.parent_id.as_deref().and_then(|id| self.get(id))
    }

    /// Records whose display name starts with `prefix`, in timeline order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |record| record.name.starts_with(prefix))
    }

    /// Returns the first record matching `key`, failing if there is none.
    ///
    /// Duplicates are tolerated but logged, since they mean the pipeline
    /// shape changed.
    pub fn require(&self, key: &RecordKey) -> Result<&Record> {
        let mut matches = self.records.iter().filter(|record| record.matches(key));

        let first = matches
            .next()
            .ok_or_else(|| RunLensError::required(key.name, key.type_label()))?;

        let duplicates = matches.count();
        if duplicates > 0 {
            warn!(
                "Found {} duplicate '{}' records, using the first one ({})",
                duplicates, key.name, first.id
            );
        }

        Ok(first)
    }

    /// Returns the first record matching any of `keys`, in timeline order.
    pub fn require_any(&self, keys: &[RecordKey]) -> Result<&Record> {
        self.records
            .iter()
            .find(|record| keys.iter().any(|key| record.matches(key)))
            .ok_or_else(|| {
                let names = keys.iter().map(|key| key.name).collect::<Vec<_>>().join(" | ");
                RunLensError::required(&names, "any")
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{Record, RecordType};

    pub fn at(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    pub fn record(
        id: &str,
        parent: Option<&str>,
        name: &str,
        record_type: RecordType,
        start: i64,
        finish: i64,
    ) -> Record {
        Record {
            id: id.to_string(),
            parent_id: parent.map(ToString::to_string),
            name: name.to_string(),
            record_type,
            start_time: Some(at(start)),
            finish_time: Some(at(finish)),
            log_id: None,
        }
    }

    pub fn job(id: &str, name: &str, start: i64, finish: i64) -> Record {
        record(id, None, name, RecordType::Job, start, finish)
    }
}
