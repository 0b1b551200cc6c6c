mod abbreviations;

pub use abbreviations::Abbreviations;

use crate::bibtex::{self, NormalizedRecord};
use crate::blog_warning;
use crate::config::Config;
use crate::config::DataFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const SUPPLEMENTAL: &str = "Supplemental";
const DEFAULT_EXTENSION: &str = ".pdf";

static YEAR_DIRECTORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());
static BIBTEX_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*-.*\.bib$").unwrap());

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Library directory {0} does not exist")]
    MissingRoot(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LibraryError + '_ {
    move |source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Metadata that places an article file in the library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleMeta {
    pub author: String,
    pub journal: String,
    pub year: String,
    pub volume: String,
    pub number: String,
    /// Extension including the dot. Empty means `.pdf`.
    pub extension: String,
    pub supplement: bool,
}

/// A BibTeX file found while walking the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub year: String,
    pub author: String,
    pub path: PathBuf,
}

/// The `<datapath>/<year>/<author>` article tree.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    dataformat: DataFormat,
    abbreviations: Abbreviations,
}

impl Library {
    pub fn new(config: &Config) -> Result<Self, LibraryError> {
        let abbreviations = match &config.abbreviations {
            Some(path) if path.exists() => Abbreviations::load(path)?,
            Some(path) => {
                blog_warning!("Warning", "Abbreviation list {} not found", path.display());
                Abbreviations::default()
            }
            None => Abbreviations::default(),
        };
        debug!(
            datapath = %config.datapath.display(),
            dataformat = config.dataformat.as_str(),
            abbreviations = abbreviations.len(),
            "opened library"
        );
        Ok(Library {
            root: config.datapath.clone(),
            dataformat: config.dataformat.clone(),
            abbreviations,
        })
    }

    pub fn author_dir(&self, year: &str, author_directory: &str) -> PathBuf {
        self.root.join(year).join(author_directory)
    }

    /// Journal abbreviation, falling back to the full name with a warning.
    pub fn abbreviation(&self, journal: &str) -> String {
        match self.abbreviations.get(journal) {
            Some(abbreviation) => abbreviation.to_string(),
            None => {
                blog_warning!("Warning", "Abbreviation for {} not found", journal);
                journal.to_string()
            }
        }
    }

    /// Target path of an article before collision handling.
    pub fn article_path(&self, meta: &ArticleMeta) -> PathBuf {
        let author = bibtex::directory_name(&meta.author);
        let mut directory = self.author_dir(&meta.year, &author);
        if meta.supplement {
            directory.push(SUPPLEMENTAL);
        }
        let journal = meta.journal.replace(' ', "_");
        let abbreviation = self.abbreviation(&meta.journal).replace(' ', "_");
        let extension = if meta.extension.is_empty() {
            DEFAULT_EXTENSION
        } else {
            meta.extension.as_str()
        };
        let name = self.dataformat.render(&[
            &author,
            &journal,
            &abbreviation,
            &meta.volume,
            &meta.number,
            &meta.year,
            extension,
        ]);
        directory.join(name)
    }

    /// Copies an article into the library without overwriting anything.
    pub fn store_article(
        &self,
        meta: &ArticleMeta,
        mut source: impl Read,
    ) -> Result<PathBuf, LibraryError> {
        let target = self.article_path(meta);
        let (mut file, path) = create_unique_file(&target)?;
        if let Err(err) = io::copy(&mut source, &mut file) {
            drop(file);
            discard(&path);
            return Err(io_error(&path)(err));
        }
        debug!(path = %path.display(), "stored article");
        Ok(path)
    }

    /// Writes `<year>/<author>/<Author-YYYYxx>.bib` without overwriting.
    pub fn write_bibtex(&self, normalized: &NormalizedRecord) -> Result<PathBuf, LibraryError> {
        let target = self
            .author_dir(&normalized.year_directory, &normalized.author_directory)
            .join(normalized.file_name());
        let (mut file, path) = create_unique_file(&target)?;
        if let Err(err) = file.write_all(normalized.to_bibtex().as_bytes()) {
            drop(file);
            discard(&path);
            return Err(io_error(&path)(err));
        }
        Ok(path)
    }

    /// Numeric year directories, sorted.
    pub fn years(&self) -> Result<Vec<PathBuf>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::MissingRoot(self.root.clone()));
        }
        sorted_children(&self.root, |path, name| {
            path.is_dir() && YEAR_DIRECTORY.is_match(name)
        })
    }

    /// Every `*-*.bib` file under `<year>/<author>`, in year, author and
    /// file name order.
    pub fn bibtex_files(&self) -> Result<Vec<LibraryEntry>, LibraryError> {
        let mut entries = Vec::new();
        for year in self.years()? {
            let authors = sorted_children(&year, |path, _| path.is_dir())?;
            for author in authors {
                for path in sorted_children(&author, |path, name| {
                    path.is_file() && BIBTEX_FILE.is_match(name)
                })? {
                    entries.push(LibraryEntry {
                        year: file_name(&year),
                        author: file_name(&author),
                        path,
                    });
                }
            }
        }
        Ok(entries)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sorted_children(
    directory: &Path,
    keep: impl Fn(&Path, &str) -> bool,
) -> Result<Vec<PathBuf>, LibraryError> {
    let mut children = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_error(directory))? {
        let path = entry.map_err(io_error(directory))?.path();
        if keep(&path, &file_name(&path)) {
            children.push(path);
        }
    }
    children.sort();
    Ok(children)
}

/// Creates `path`, or `stem-1.ext`, `stem-2.ext`, ... if it exists.
///
/// Parent directories are created first. Each attempt is an exclusive
/// create, so an existing file is never truncated.
pub fn create_unique_file(path: &Path) -> Result<(File, PathBuf), LibraryError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io_error(parent))?;

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = path.to_path_buf();
    let mut counter = 1u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                candidate = parent.join(format!("{}-{}{}", stem, counter, extension));
                counter += 1;
            }
            Err(err) => return Err(io_error(&candidate)(err)),
        }
    }
}

// Removes a partly written file so a retry does not land next to it.
fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        debug!(path = %path.display(), %err, "could not remove partial file");
    }
}
