use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::analysis::{Record, RecordType, Run, Timeline};

/// Envelope used by every Azure DevOps list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: usize,
    pub value: Vec<T>,
}

/// A build pipeline definition.
#[derive(Debug, Deserialize)]
pub struct DefinitionReference {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectReference {
    pub name: String,
}

/// A build, as returned by `_apis/build/builds`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: u64,
    pub status: Option<String>,
    pub result: Option<String>,
    pub source_branch: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub project: ProjectReference,
}

/// A build timeline, as returned by `_apis/build/builds/{id}/timeline`.
#[derive(Debug, Default, Deserialize)]
pub struct BuildTimeline {
    #[serde(default)]
    pub records: Vec<TimelineRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub log: Option<LogReference>,
}

#[derive(Debug, Deserialize)]
pub struct LogReference {
    pub id: u64,
}

impl From<Build> for Run {
    fn from(build: Build) -> Self {
        Self {
            id: build.id,
            project: build.project.name,
            branch: build.source_branch.unwrap_or_default(),
            start_time: build.start_time,
            finish_time: build.finish_time,
            status: build.status.unwrap_or_default(),
            result: build.result,
        }
    }
}

impl From<TimelineRecord> for Record {
    fn from(record: TimelineRecord) -> Self {
        Self {
            id: record.id,
            parent_id: record.parent_id,
            name: record.name.unwrap_or_default(),
            record_type: RecordType::parse(record.record_type.as_deref().unwrap_or_default()),
            start_time: record.start_time,
            finish_time: record.finish_time,
            log_id: record.log.map(|log| log.id),
        }
    }
}

impl From<BuildTimeline> for Timeline {
    fn from(timeline: BuildTimeline) -> Self {
        Timeline::new(timeline.records.into_iter().map(Record::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_record_conversion() {
        let json = r#"{
            "records": [
                {
                    "id": "a1",
                    "parentId": null,
                    "type": "Job",
                    "name": "Prepare Signed Artifacts",
                    "startTime": "2020-06-01T08:00:00.1234567Z",
                    "finishTime": "2020-06-01T08:10:00.1234567Z",
                    "state": "completed",
                    "result": "succeeded",
                    "log": { "id": 17, "type": "Container", "url": "https://example.invalid/logs/17" }
                },
                {
                    "id": "b2",
                    "parentId": "a1",
                    "type": "Task",
                    "name": "Build",
                    "startTime": null,
                    "finishTime": null,
                    "log": null
                }
            ]
        }"#;

        let timeline: Timeline = serde_json::from_str::<BuildTimeline>(json).unwrap().into();
        let records = timeline.records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, RecordType::Job);
        assert_eq!(records[0].log_id, Some(17));
        assert_eq!(
            records[0].duration().unwrap(),
            chrono::Duration::minutes(10)
        );
        assert_eq!(timeline.parent(&records[1]).unwrap().id, "a1");
        assert!(records[1].start_time.is_none());
        assert!(records[1].log_id.is_none());
    }

    #[test]
    fn test_build_conversion() {
        let json = r#"{
            "id": 712345,
            "buildNumber": "20200601.3",
            "status": "completed",
            "result": "succeeded",
            "sourceBranch": "refs/heads/master",
            "startTime": "2020-06-01T08:00:00Z",
            "finishTime": "2020-06-01T11:00:00Z",
            "project": { "id": "0bdbc590", "name": "internal" }
        }"#;

        let run: Run = serde_json::from_str::<Build>(json).unwrap().into();

        assert_eq!(run.id, 712_345);
        assert_eq!(run.project, "internal");
        assert_eq!(run.branch, "refs/heads/master");
        assert_eq!(run.result.as_deref(), Some("succeeded"));
        assert_eq!(run.duration().unwrap(), chrono::Duration::hours(3));
    }
}
