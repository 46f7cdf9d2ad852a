//! Interpreting the text of controller replies.
//!
//! Replies are short and loosely structured, e.g. `SD0,1` or `S2,0`, so a few
//! helpers that pick them apart cover every query.

use crate::error::MalformedReplyError;
use std::str::FromStr;

/// Parse the whole reply, ignoring surrounding whitespace.
pub(crate) fn parse<T: FromStr>(
    command: &str,
    reply: &str,
    expected: &'static str,
) -> Result<T, MalformedReplyError> {
    reply
        .trim()
        .parse()
        .map_err(|_| MalformedReplyError::new(command, reply, expected))
}

/// Parse the comma separated field at `index` (zero-based).
pub(crate) fn parse_field<T: FromStr>(
    command: &str,
    reply: &str,
    index: usize,
    expected: &'static str,
) -> Result<T, MalformedReplyError> {
    reply
        .split(',')
        .nth(index)
        .and_then(|field| field.trim().parse().ok())
        .ok_or_else(|| MalformedReplyError::new(command, reply, expected))
}

/// Parse the final character of the reply as a decimal digit.
pub(crate) fn last_digit(
    command: &str,
    reply: &str,
    expected: &'static str,
) -> Result<u8, MalformedReplyError> {
    reply
        .trim_end()
        .chars()
        .next_back()
        .and_then(|c| c.to_digit(10))
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| MalformedReplyError::new(command, reply, expected))
}

/// Parse whatever follows `tag` at the start of the reply.
///
/// A leading `:` before the tag is accepted.
pub(crate) fn parse_tagged<T: FromStr>(
    command: &str,
    reply: &str,
    tag: &str,
    expected: &'static str,
) -> Result<T, MalformedReplyError> {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix(':')
        .unwrap_or(trimmed)
        .strip_prefix(tag)
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| MalformedReplyError::new(command, reply, expected))
}

/// Extract the sensor code from a sensor type name reply.
///
/// Quotes and carriage returns are removed and only the text before the
/// first `.` is kept, so `"SL.012"` becomes `SL`.
pub(crate) fn sensor_code(reply: &str) -> String {
    let cleaned = reply.replace(['"', '\r'], "");
    match cleaned.split_once('.') {
        Some((code, _)) => code.to_string(),
        None => cleaned,
    }
}
