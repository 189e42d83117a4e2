// crates/core/src/progress.rs
//! Progress-token extraction from downloader output.
//!
//! The downloader's progress mode prints a percentage per line (for yt-dlp,
//! `%(progress._percent_str)s` renders as e.g. ` 37.5%`). Everything else it
//! prints is chatter and must be ignored, not treated as an error.

use regex_lite::Regex;
use std::sync::OnceLock;

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid progress regex"))
}

/// Extract a completion percentage from one line of downloader output.
///
/// Returns the first number immediately followed by `%`, if it parses and
/// lies within `0..=100`. Returns `None` for anything else.
pub fn extract_progress(line: &str) -> Option<f64> {
    let caps = percent_regex().captures(line)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value)
}
