// crates/core/src/lib.rs
pub mod downloader;
pub mod error;
pub mod filename;
pub mod id;
pub mod progress;
pub mod source;

pub use downloader::{spawn_piped, Downloader, YtDlp};
pub use error::*;
pub use filename::derive_filename;
pub use id::{is_valid_job_id, IdGenerator};
pub use progress::extract_progress;
pub use source::{is_supported_url, Platform};

#[cfg(feature = "test-util")]
pub use downloader::ScriptDownloader;
