use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("Invalid remote '{0}', expected [user@]host:/path")]
    InvalidRemote(String),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid permission mode '{0}'")]
    InvalidMode(String),

    #[error("Unexpected modification time '{value}' for {path}")]
    InvalidMtime { path: String, value: String },
}

pub(super) fn io_error(path: &std::path::Path) -> impl FnOnce(io::Error) -> SyncError + '_ {
    move |source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}
