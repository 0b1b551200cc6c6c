use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("BibTeX processing failed: {0}")]
    Bibtex(#[from] crate::bibtex::BibtexError),

    #[error("RIS conversion failed: {0}")]
    Ris(#[from] crate::ris::RisError),

    #[error("{0}")]
    Doi(#[from] crate::doi::DoiError),

    #[error("Library operation failed: {0}")]
    Library(#[from] crate::library::LibraryError),

    #[error("Sync failed: {0}")]
    Sync(#[from] crate::sync::SyncError),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("Clipboard is empty")]
    EmptyClipboard,

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{failed} of {total} inputs failed")]
    Batch { failed: usize, total: usize },
}
