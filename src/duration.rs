//! Course duration derivation.
//!
//! Document lessons without an explicit duration are estimated from the
//! whitespace-delimited token count of their content. Inline HTML is not
//! stripped, so markup tokens count as words.

use crate::error::ValidationError;
use crate::models::{Lesson, LessonType, Module};

pub const WORDS_PER_MINUTE: usize = 200;

fn parse_parts(raw: &str) -> Option<Vec<u64>> {
    raw.split(':').map(|p| p.trim().parse::<u64>().ok()).collect()
}

fn minutes_seconds(m: u64, s: u64) -> Option<u64> {
    m.checked_mul(60)?.checked_add(s)
}

/// `MM:SS` or `HH:MM:SS` to seconds. Malformed or overflowing input yields 0.
pub fn parse_clock(raw: &str) -> u64 {
    let seconds = match parse_parts(raw).as_deref() {
        Some([m, s]) => minutes_seconds(*m, *s),
        Some([h, m, s]) => h.checked_mul(3600).and_then(|h| h.checked_add(minutes_seconds(*m, *s)?)),
        _ => None,
    };
    seconds.unwrap_or(0)
}

/// `MM:SS` only. Malformed input (including `HH:MM:SS`) yields 0.
pub fn parse_minutes_seconds(raw: &str) -> u64 {
    match parse_parts(raw).as_deref() {
        Some([m, s]) => minutes_seconds(*m, *s).unwrap_or(0),
        _ => 0,
    }
}

pub fn word_count(content: &str) -> usize {
    // a non-empty string always splits into at least one token
    content.split_whitespace().count().max(1)
}

pub fn estimated_reading_seconds(content: &str) -> u64 {
    let minutes = word_count(content).div_ceil(WORDS_PER_MINUTE);
    minutes as u64 * 60
}

pub fn lesson_seconds(lesson: &Lesson) -> u64 {
    match (lesson.kind, lesson.duration.as_deref()) {
        (LessonType::Video, Some(d)) => parse_clock(d),
        (LessonType::Document, Some(d)) => parse_minutes_seconds(d),
        (LessonType::Document, None) if !lesson.content.is_empty() => {
            estimated_reading_seconds(&lesson.content)
        }
        _ => 0,
    }
}

pub fn total_seconds(modules: &[Module]) -> u64 {
    modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .map(lesson_seconds)
        .fold(0, u64::saturating_add)
}

pub fn format_total(seconds: u64) -> String {
    if seconds == 0 {
        return "0m".into();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn calculate_total_duration(modules: &[Module]) -> String {
    format_total(total_seconds(modules))
}

pub fn total_lessons(modules: &[Module]) -> usize {
    modules.iter().map(|m| m.lessons.len()).sum()
}

/// Authoring-time check for a lesson duration field: empty, or `M:SS`/`MM:SS`
/// with minutes 0-59 and seconds 00-59.
pub fn validate_input(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Ok(());
    }
    let bad = || ValidationError::MalformedDuration(raw.to_string());
    let (minutes, seconds) = raw.split_once(':').ok_or_else(bad)?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let minutes_ok = digits(minutes)
        && match minutes.as_bytes() {
            [_] => true,
            [tens, _] => *tens <= b'5',
            _ => false,
        };
    let seconds_ok = digits(seconds) && seconds.len() == 2 && seconds.as_bytes()[0] <= b'5';
    if minutes_ok && seconds_ok {
        Ok(())
    } else {
        Err(bad())
    }
}
