// crates/server/src/config.rs
//! Command-line and environment configuration for the server binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::gateway::DEFAULT_SAVE_TIMEOUT;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8080;

/// Start the media download server.
#[derive(Parser, Debug, Clone)]
#[clap(name = "mediafetch", version)]
pub struct ServerConfig {
    /// Address to bind.
    #[clap(long, env = "MEDIAFETCH_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on.
    #[clap(long, short, env = "MEDIAFETCH_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Downloader executable. Must accept the yt-dlp command line.
    #[clap(long, env = "MEDIAFETCH_DOWNLOADER", default_value = "yt-dlp")]
    pub downloader: PathBuf,

    /// Upper bound on one file retrieval, in seconds.
    #[clap(long, env = "MEDIAFETCH_SAVE_TIMEOUT_SECS", default_value_t = DEFAULT_SAVE_TIMEOUT.as_secs())]
    pub save_timeout_secs: u64,

    /// Forget completed and failed downloads this many seconds after they
    /// finish. Unset keeps every job for the life of the process.
    #[clap(long, env = "MEDIAFETCH_JOB_TTL_SECS")]
    pub job_ttl_secs: Option<u64>,

    /// Serve a front-end from this directory for non-API paths.
    #[clap(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }

    pub fn job_ttl(&self) -> Option<Duration> {
        self.job_ttl_secs.map(Duration::from_secs)
    }
}
