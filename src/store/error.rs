use std::path::PathBuf;

use crate::transcript::TranscriptError;

/// Failures surfaced by the store.
///
/// Directory and cache errors abort the command. Transcript errors only skip
/// the file during a refresh. `SessionNotFound` is kept apart from I/O.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("reading projects dir {}", path.display())]
    ProjectsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {}", path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}", path.display())]
    CacheParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("writing {}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading transcript {}", path.display())]
    Transcript {
        path: PathBuf,
        #[source]
        source: TranscriptError,
    },

    #[error("no session matches '{0}'")]
    SessionNotFound(String),
}
