// crates/core/src/filename.rs
//! Attachment filename derivation for retrieved media.

use url::Url;

/// Used whenever the URL has no usable final path segment.
pub const DEFAULT_FILENAME: &str = "downloaded_video.mp4";

/// Derive a download filename from a source URL.
///
/// Takes the last path segment, strips query and fragment remnants, and
/// appends `.mp4` when there is no extension. URLs without a scheme are
/// parsed as `https://`. The result is safe to embed in a quoted
/// `Content-Disposition` filename parameter.
pub fn derive_filename(raw_url: &str) -> String {
    let parsed = Url::parse(raw_url).or_else(|_| Url::parse(&format!("https://{raw_url}")));
    let Ok(url) = parsed else {
        return DEFAULT_FILENAME.to_string();
    };

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let segment = segment.split(['?', '#']).next().unwrap_or("");

    if segment.is_empty() || segment == "." || segment == ".." {
        return DEFAULT_FILENAME.to_string();
    }

    let mut name = sanitize(segment);
    if !name.contains('.') {
        name.push_str(".mp4");
    }
    name
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
