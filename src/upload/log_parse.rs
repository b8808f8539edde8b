//! Result extraction from the storage client's textual log output.
//!
//! The client offers no structured output mode, so the upload outcome is
//! scraped from its combined stdout/stderr. The grammar lives behind
//! [`parse_client_log`] alone; swapping the client for one with a
//! machine-parseable protocol only touches this module.

use regex::Regex;
use std::sync::LazyLock;

/// A successful upload ends with a line of the form
/// `Upload <text> Done [<identifier>]`.
static DONE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Upload .+ Done \[(.+)\]").expect("upload marker pattern is valid"));

/// Substring marking the client's transfer statistics line.
const TRANSFER_SUMMARY_MARKER: &str = "transferred in";

const LOG_EXCERPT_MAX: usize = 512;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedClientLog {
    /// Storage identifier from the first matching upload marker line, if any.
    pub identifier: Option<String>,
    /// First transfer statistics line, if any. Diagnostic only.
    pub transfer_summary: Option<String>,
}

/// Scans the client log for the upload marker and the transfer summary.
/// The first matching line wins for each; absence of the summary line is
/// not an error, absence of the marker is decided by the caller.
pub fn parse_client_log(content: &str) -> ParsedClientLog {
    let mut parsed = ParsedClientLog::default();
    for line in content.lines() {
        if parsed.identifier.is_none() {
            if let Some(captures) = DONE_LINE.captures(line) {
                parsed.identifier = Some(captures[1].to_string());
            }
        }
        if parsed.transfer_summary.is_none() && line.contains(TRANSFER_SUMMARY_MARKER) {
            parsed.transfer_summary = Some(line.trim().to_string());
        }
        if parsed.identifier.is_some() && parsed.transfer_summary.is_some() {
            break;
        }
    }
    parsed
}

/// Tail of the log content bounded to a size fit for error diagnostics.
pub fn log_excerpt(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.len() <= LOG_EXCERPT_MAX {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - LOG_EXCERPT_MAX;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}
