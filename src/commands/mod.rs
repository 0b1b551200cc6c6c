pub mod articles;
pub mod citekey;
pub mod export;
pub mod format;
pub mod open;
pub mod ris;
pub mod search;
pub mod smart_bibtex;
pub mod sync;

use crate::bibtex::NormalizedRecord;
use crate::config::Config;
use crate::error::AppError;
use crate::library::Library;
use crate::ui::{self, blog_done, blog_warning, error_message};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What every command needs from the command line.
pub struct Context {
    config_path: Option<PathBuf>,
    pub verbose: u8,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, verbose: u8) -> Self {
        Context {
            config_path,
            verbose,
        }
    }

    pub fn config(&self) -> Result<Config, AppError> {
        Ok(Config::load(self.config_path.as_deref())?)
    }

    pub fn library(&self) -> Result<Library, AppError> {
        Ok(Library::new(&self.config()?)?)
    }
}

/// Per-input outcomes of a command run over several inputs.
#[derive(Debug, Default)]
pub struct BatchReport {
    succeeded: Vec<String>,
    failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, input: impl fmt::Display) {
        self.succeeded.push(input.to_string());
    }

    /// Records a failure and reports it right away.
    pub fn failure(&mut self, input: impl fmt::Display, err: impl fmt::Display) {
        let input = input.to_string();
        let reason = err.to_string();
        error_message(&format!("{}: {}", input, reason));
        self.failed.push((input, reason));
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Prints the summary line. Any failure turns into an error.
    pub fn finish(self, category: &str) -> Result<(), AppError> {
        if self.failed.is_empty() {
            if self.total() > 1 {
                blog_done!(category, "{} inputs", self.total());
            }
            Ok(())
        } else {
            blog_warning!(
                category,
                "{} succeeded, {} failed",
                self.succeeded.len(),
                self.failed.len()
            );
            Err(AppError::Batch {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// Prints the entry, or writes it into the library when one is given.
pub fn emit_record(normalized: &NormalizedRecord, library: Option<&Library>) -> Result<(), AppError> {
    let citekey = &normalized.citekey;
    if !citekey.is_doi_based() && !citekey.is_title_based() {
        blog_warning!("Warning", "{} has a random suffix and is not reproducible", citekey);
    }
    match library {
        Some(library) => {
            let path = library.write_bibtex(normalized)?;
            blog_done!("Saved", "{}", ui::tilde(&path).display());
        }
        None => print!("{}", normalized.to_bibtex()),
    }
    Ok(())
}

/// Removes an input file that was processed successfully.
pub fn remove_input(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed input"),
        Err(err) => blog_warning!("Warning", "Could not remove {}: {}", path.display(), err),
    }
}

pub fn read_input(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}
