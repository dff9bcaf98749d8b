use chrono::{DateTime, Duration, Utc};
use serde::Serializer;

use super::timeline::Record;
use crate::error::{RunLensError, Result};

/// Elapsed time between two timestamps of the item described by `label`.
///
/// Both timestamps must be set, and the finish must not precede the start.
pub fn elapsed(
    label: &str,
    start: Option<DateTime<Utc>>,
    finish: Option<DateTime<Utc>>,
) -> Result<Duration> {
    let (Some(start), Some(finish)) = (start, finish) else {
        return Err(RunLensError::MissingTimestamp {
            record: label.to_string(),
        });
    };

    non_negative(label, finish - start)
}

pub fn record_duration(record: &Record) -> Result<Duration> {
    elapsed(&record.name, record.start_time, record.finish_time)
}

/// Rejects negative durations, which only arise from malformed timelines.
pub fn non_negative(label: &str, duration: Duration) -> Result<Duration> {
    if duration < Duration::zero() {
        return Err(RunLensError::NegativeDuration {
            record: label.to_string(),
        });
    }
    Ok(duration)
}

/// Largest duration among `records`, or `None` when there are none.
pub fn max_record_duration<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> Result<Option<Duration>> {
    records
        .into_iter()
        .map(Record::duration)
        .try_fold(None, |max: Option<Duration>, duration| {
            let duration = duration?;
            Ok(Some(max.map_or(duration, |max| max.max(duration))))
        })
}

/// Milliseconds with sub-millisecond precision.
#[allow(clippy::cast_precision_loss)]
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration
        .num_microseconds()
        .map_or_else(|| duration.num_milliseconds() as f64, |us| us as f64 / 1000.0)
}

#[allow(clippy::cast_possible_truncation)]
pub fn from_millis_f64(millis: f64) -> Duration {
    Duration::microseconds((millis * 1000.0).round() as i64)
}

pub fn as_seconds_f64(duration: Duration) -> f64 {
    as_millis_f64(duration) / 1000.0
}

/// Renders a duration as `h:mm:ss`, with a leading `-` when negative.
pub fn format_duration(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { "-" } else { "" };
    let total = duration.num_seconds().abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// `serialize_with` helper emitting a duration as fractional seconds.
pub fn serialize_seconds<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(as_seconds_f64(*duration))
}
