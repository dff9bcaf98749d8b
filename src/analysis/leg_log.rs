use std::sync::OnceLock;

use chrono::Duration;
use regex::Regex;

use crate::error::{RunLensError, Result};

const TICKS_PER_SECOND_DIGITS: usize = 7;

fn completion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-> completed in ([0-9:.]+)").expect("leg completion pattern is valid")
    })
}

/// Extracts the leg duration reported on a single log line, if the line reports one.
pub fn parse_leg_line(line: &str) -> Result<Option<Duration>> {
    completion_pattern()
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|literal| parse_timespan(literal.as_str()))
        .transpose()
}

/// Sums every leg duration reported in one step's log.
///
/// Legs reported by a single step invocation run one after another, so they
/// add up. Lines without a completion marker are ignored; a log without any
/// yields zero.
pub fn log_leg_total<S: AsRef<str>>(lines: &[S]) -> Result<Duration> {
    lines
        .iter()
        .filter_map(|line| parse_leg_line(line.as_ref()).transpose())
        .try_fold(Duration::zero(), |total, leg| Ok(total + leg?))
}

/// Parses a `[d.]hh:mm[:ss[.fffffff]]` (or bare `d`) duration literal.
pub fn parse_timespan(literal: &str) -> Result<Duration> {
    let invalid = || RunLensError::InvalidDurationLiteral(literal.to_string());

    // Sentence punctuation right after the literal is caught by the pattern.
    let trimmed = literal.trim_end_matches('.');
    let parts: Vec<&str> = trimmed.split(':').collect();

    let (days, hours, minutes, seconds, fraction) = match parts.as_slice() {
        [days] => (parse_component(days, u32::MAX).ok_or_else(invalid)?, 0, 0, 0, ""),
        [head, minutes] => {
            let (days, hours) = split_days(head).ok_or_else(invalid)?;
            let minutes = parse_component(minutes, 59).ok_or_else(invalid)?;
            (days, hours, minutes, 0, "")
        }
        [head, minutes, seconds] => {
            let (days, hours) = split_days(head).ok_or_else(invalid)?;
            let minutes = parse_component(minutes, 59).ok_or_else(invalid)?;
            let (seconds, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
            let seconds = parse_component(seconds, 59).ok_or_else(invalid)?;
            (days, hours, minutes, seconds, fraction)
        }
        _ => return Err(invalid()),
    };

    if fraction.len() > TICKS_PER_SECOND_DIGITS || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse::<i64>().map_err(|_| invalid())?
    };

    let whole_seconds = i64::from(days) * 86_400
        + i64::from(hours) * 3_600
        + i64::from(minutes) * 60
        + i64::from(seconds);

    Ok(Duration::seconds(whole_seconds) + Duration::nanoseconds(nanos))
}

fn split_days(head: &str) -> Option<(u32, u32)> {
    match head.split_once('.') {
        Some((days, hours)) => Some((parse_component(days, u32::MAX)?, parse_component(hours, 23)?)),
        None => Some((0, parse_component(head, 23)?)),
    }
}

fn parse_component(value: &str, max: u32) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().filter(|&v| v <= max)
}
