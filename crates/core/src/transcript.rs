//! Day-level chunking of exported chat transcripts.
//!
//! Each chunk becomes the prompt of one extraction pass and, through
//! [`compute_cache_key`](crate::cache::hash::compute_cache_key), one cache key.

use std::sync::LazyLock;

use regex::Regex;

/// `[DD.MM.YY, HH:MM:SS]` at line start, optionally after a left-to-right mark.
static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x{200E}?\[(\d{2}\.\d{2}\.\d{2}), (\d{2}:\d{2}:\d{2})\]").expect("timestamp pattern is valid")
});

/// Split a chat export into one chunk per calendar day.
///
/// A line opening with a timestamp starts or continues the chunk of its date;
/// any other line belongs to the most recent date seen. Lines before the first
/// timestamp are dropped. Chunks come out in order of each date's first
/// appearance, with lines joined by `\n`.
pub fn chunk_transcript_by_day(text: &str) -> Vec<String> {
    let mut days: Vec<(String, Vec<&str>)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.trim().split('\n') {
        if let Some(captures) = TIMESTAMP_PATTERN.captures(line) {
            let date = &captures[1];
            let slot = match days.iter().position(|(day, _)| day == date) {
                Some(slot) => slot,
                None => {
                    days.push((date.to_string(), Vec::new()));
                    days.len() - 1
                }
            };
            days[slot].1.push(line);
            current = Some(slot);
        } else if let Some(slot) = current {
            days[slot].1.push(line);
        }
    }

    tracing::debug!(days = days.len(), "chunked transcript by day");
    days.into_iter().map(|(_, lines)| lines.join("\n")).collect()
}
