// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised while launching the external downloader.
#[derive(Debug, Error)]
pub enum DownloaderError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} started without a captured {stream} pipe")]
    MissingPipe {
        program: String,
        stream: &'static str,
    },

    #[error("downloader not available: {0}")]
    Unavailable(String),
}

impl DownloaderError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn missing_pipe(program: impl Into<String>, stream: &'static str) -> Self {
        Self::MissingPipe {
            program: program.into(),
            stream,
        }
    }

    /// True when the binary itself could not be found on PATH.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_display() {
        let err = DownloaderError::spawn(
            "yt-dlp",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert_eq!(
            err.to_string(),
            "failed to spawn yt-dlp: No such file or directory"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_pipe_display() {
        let err = DownloaderError::missing_pipe("yt-dlp", "stdout");
        assert_eq!(err.to_string(), "yt-dlp started without a captured stdout pipe");
        assert!(!err.is_not_found());
    }
}
