use super::read_input;
use crate::error::AppError;
use crate::library::Library;
use crate::ui::{self, blog_done, blog_warning};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static ENTRY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\s*(\w+)\s*\{\s*([^,\s]*)\s*,").unwrap());

/// Order of the exported entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    /// First author, through the citekey
    #[default]
    #[value(name = "author")]
    Citekey,
    Year,
    /// BibTeX entry type
    #[value(name = "type")]
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportEntry {
    citekey: String,
    year: String,
    entry_type: String,
    text: String,
}

impl ExportEntry {
    fn key(&self, sort: SortKey) -> &str {
        match sort {
            SortKey::Citekey => &self.citekey,
            SortKey::Year => &self.year,
            SortKey::Type => &self.entry_type,
        }
    }
}

fn collect(library: &Library) -> Result<Vec<ExportEntry>, AppError> {
    let mut entries = Vec::new();
    for file in library.bibtex_files()? {
        let text = read_input(&file.path)?;
        let lowered = text.to_lowercase();
        let Some(caps) = ENTRY_HEADER.captures(&lowered) else {
            blog_warning!("Skipped", "{}: no entry header", ui::tilde(&file.path).display());
            continue;
        };
        entries.push(ExportEntry {
            entry_type: caps[1].to_string(),
            citekey: caps[2].to_string(),
            year: file.year,
            text,
        });
    }
    Ok(entries)
}

/// Concatenates every library entry into one sorted BibTeX document.
pub fn render(library: &Library, sort: SortKey) -> Result<(String, usize), AppError> {
    let mut entries = collect(library)?;
    entries.sort_by(|a, b| a.key(sort).cmp(b.key(sort)));

    let mut out = format!(
        "%% BibTeX File Created on {}\n%% Number of Entries: {}\n\n",
        Local::now().format("%Y-%m-%d"),
        entries.len()
    );
    for entry in &entries {
        out.push_str(&entry.text);
        out.push('\n');
    }
    Ok((out, entries.len()))
}

/// Writes the sorted library to `export`, or to standard output.
pub fn export(library: &Library, sort: SortKey, export: Option<&Path>) -> Result<(), AppError> {
    let (document, count) = render(library, sort)?;
    match export {
        Some(path) => {
            fs::write(path, document).map_err(|source| AppError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            blog_done!("Exported", "{} entries to {}", count, ui::tilde(path).display());
        }
        None => print!("{}", document),
    }
    Ok(())
}
