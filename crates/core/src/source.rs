// crates/core/src/source.rs
//! Supported media sources.
//!
//! A URL is accepted when it matches one of a fixed, ordered set of
//! platform-specific shapes. The scheme and a leading `www.` are optional.
//! Matching is purely syntactic: nothing here touches the network.

use regex_lite::Regex;
use std::sync::OnceLock;

/// A platform the downloader is allowed to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Twitter,
    Pornhub,
}

/// Ordered allow-list. First match wins.
const PATTERNS: &[(Platform, &str)] = &[
    (
        Platform::YouTube,
        r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+",
    ),
    (
        Platform::TikTok,
        r"^(https?://)?(www\.)?(tiktok\.com/@.+/video/\d+|vm\.tiktok\.com/[A-Za-z0-9]+/?)",
    ),
    (
        Platform::Instagram,
        r"^(https?://)?(www\.)?instagram\.com/reels?/.+",
    ),
    (
        Platform::Twitter,
        r"^(https?://)?(www\.)?(twitter\.com|x\.com)/.+/status/\d+",
    ),
    (
        Platform::Pornhub,
        r"^(https?://)?(www\.)?pornhub\.com/view_video\.php\?viewkey=[a-zA-Z0-9]+",
    ),
];

fn compiled() -> &'static [(Platform, Regex)] {
    static COMPILED: OnceLock<Vec<(Platform, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(platform, pattern)| (*platform, Regex::new(pattern).expect("valid source pattern")))
            .collect()
    })
}

impl Platform {
    /// Identify which supported platform a URL belongs to.
    pub fn detect(url: &str) -> Option<Self> {
        compiled()
            .iter()
            .find(|(_, re)| re.is_match(url))
            .map(|(platform, _)| *platform)
    }

    /// Human-readable platform name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::TikTok => "TikTok",
            Self::Instagram => "Instagram Reels",
            Self::Twitter => "Twitter/X",
            Self::Pornhub => "Pornhub",
        }
    }

    /// Every platform, in matching order.
    pub fn all() -> [Self; 5] {
        [
            Self::YouTube,
            Self::TikTok,
            Self::Instagram,
            Self::Twitter,
            Self::Pornhub,
        ]
    }
}

/// Returns `true` if the URL matches any supported platform.
pub fn is_supported_url(url: &str) -> bool {
    Platform::detect(url).is_some()
}
