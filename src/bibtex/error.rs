use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BibtexError {
    #[error("Failed to parse BibTeX: {0}")]
    ParseFailed(String),

    #[error("No entries found in BibTeX")]
    NoEntries,

    #[error("Unknown BibTeX entry type '@{0}'")]
    UnknownEntryType(String),

    #[error("Missing required field '{field}' in BibTeX entry")]
    MissingField { field: String },

    #[error("Invalid field value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}
