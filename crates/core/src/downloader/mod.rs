// crates/core/src/downloader/mod.rs
//! External downloader integration.
//!
//! The downloader is a black-box binary. It is invoked in two independent
//! ways: a tracked run that reports progress, and a retrieval run that
//! streams the media bytes to stdout. See [`Downloader`].

pub mod provider;
#[cfg(feature = "test-util")]
pub mod script;
pub mod ytdlp;

pub use provider::{spawn_piped, Downloader};
#[cfg(feature = "test-util")]
pub use script::ScriptDownloader;
pub use ytdlp::YtDlp;
