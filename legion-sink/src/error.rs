//! Error kinds for artefact persistence
//!
//! Level 4 - error plumbing

/// Errors raised while persisting test artefacts to disk.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artefact {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("target stdout was not valid UTF-8: {0}")]
    NonUtf8Stdout(#[from] std::string::FromUtf8Error),

    #[error("failed to hash source file {path}: {source}")]
    Hash {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
