use super::read_input;
use crate::bibtex::{self, RawEntry};
use crate::doi::doi_url;
use crate::error::AppError;
use crate::library::{Library, LibraryEntry};
use crate::symbols::{self, Column};
use crate::ui::{self, blog_done, blog_warning};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Search terms. Every list is OR-ed, the lists are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub authors: Vec<String>,
    /// Only match the first author.
    pub first: bool,
    pub years: Vec<String>,
    /// Matched against the title and the keywords.
    pub keywords: Vec<String>,
    pub journals: Vec<String>,
    pub dois: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Open the directory of every match.
    pub open: bool,
    /// Open the webpage of every match.
    pub webpage: bool,
    pub export: Option<PathBuf>,
    /// Newest years first.
    pub reverse: bool,
}

struct Matcher {
    author: Option<Regex>,
    journal: Option<Regex>,
    keyword: Option<Regex>,
    year: Option<Regex>,
    dois: Vec<String>,
}

fn any_of(patterns: &[String], anchored: bool) -> Result<Option<Regex>, AppError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    // stored values are compared in combining form, so typed accents are too
    let table = symbols::mappings(true, false);
    let joined = patterns
        .iter()
        .map(|pattern| symbols::convert_with(&table, pattern, &[Column::Unicode], Column::Combining))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = if anchored {
        format!("^(?:{})", joined)
    } else {
        joined
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|err| AppError::InvalidArguments(err.to_string()))
}

impl Matcher {
    fn new(query: &SearchQuery) -> Result<Self, AppError> {
        Ok(Matcher {
            author: any_of(&query.authors, query.first)?,
            journal: any_of(&query.journals, false)?,
            keyword: any_of(&query.keywords, false)?,
            year: any_of(&query.years, true)?,
            dois: query.dois.clone(),
        })
    }

    fn year_matches(&self, year: &str) -> bool {
        self.year.as_ref().map_or(true, |regex| regex.is_match(year))
    }

    fn matches(&self, entry: &RawEntry) -> bool {
        let field = |name: &str| entry.get(name).map(symbols::latex_to_combining);
        let search = |regex: &Option<Regex>, name: &str| match regex {
            None => true,
            Some(regex) => field(name).is_some_and(|value| regex.is_match(&value)),
        };

        let keyword = self.keyword.is_none()
            || search(&self.keyword, "title")
            || search(&self.keyword, "keywords");
        let doi = self.dois.is_empty()
            || field("doi").is_some_and(|doi| self.dois.iter().any(|wanted| *wanted == doi));

        search(&self.author, "author") && search(&self.journal, "journal") && keyword && doi
    }
}

/// Counts reported after a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    pub matched: usize,
    pub queried: usize,
}

/// Walks the library and prints or exports every matching entry.
pub fn search(
    library: &Library,
    query: &SearchQuery,
    options: &SearchOptions,
) -> Result<SearchSummary, AppError> {
    let matcher = Matcher::new(query)?;
    let mut files: Vec<LibraryEntry> = library
        .bibtex_files()?
        .into_iter()
        .filter(|entry| matcher.year_matches(&entry.year))
        .collect();
    if options.reverse {
        files.sort_by(|a, b| b.year.cmp(&a.year));
    }

    let mut exported = String::new();
    let mut summary = SearchSummary {
        matched: 0,
        queried: 0,
    };
    for file in &files {
        let text = read_input(&file.path)?;
        summary.queried += 1;
        let entry = match bibtex::parse_entry(&text) {
            Ok(entry) => entry,
            Err(err) => {
                blog_warning!("Skipped", "{}: {}", ui::tilde(&file.path).display(), err);
                continue;
            }
        };
        if !matcher.matches(&entry) {
            continue;
        }
        summary.matched += 1;
        debug!(path = %file.path.display(), "match");

        if options.export.is_some() {
            exported.push_str(&text);
            exported.push('\n');
        } else {
            println!("{}", text);
        }
        if options.open {
            if let Some(directory) = file.path.parent() {
                open::that(directory).map_err(|source| AppError::Open {
                    target: directory.display().to_string(),
                    source,
                })?;
            }
        }
        if options.webpage {
            if let Some(url) = webpage(&entry) {
                webbrowser::open(&url).map_err(|source| AppError::Open {
                    target: url.clone(),
                    source,
                })?;
            }
        }
    }

    if let Some(path) = &options.export {
        fs::write(path, exported).map_err(|source| AppError::Write {
            path: path.clone(),
            source,
        })?;
        blog_done!("Exported", "{}", ui::tilde(path).display());
    }
    println!(
        "Matching references = {} out of {} queried",
        summary.matched, summary.queried
    );
    Ok(summary)
}

/// The url field, or the DOI resolver page.
fn webpage(entry: &RawEntry) -> Option<String> {
    entry
        .get("url")
        .map(str::to_string)
        .or_else(|| entry.get("doi").map(doi_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibtex::normalize_bibtex;
    use crate::config::Config;
    use std::path::Path;
    use tempfile::TempDir;

    const ENTRIES: [&str; 3] = [
        "@article{x, author = {Eric Rignot and Jonathan Bamber}, year = {2008},
          title = {Recent Antarctic ice mass loss}, journal = {Nature Geoscience},
          doi = {10.1038/ngeo102}}",
        "@article{x, author = {J{\\\"o}rg M{\\\"u}ller}, year = {2011},
          title = {Glacier flow}, journal = {Journal of Glaciology},
          keywords = {Greenland, outlet glaciers}}",
        "@article{x, author = {Jonathan Bamber}, year = {2013},
          title = {A new bed elevation dataset for Greenland}, journal = {The Cryosphere}}",
    ];

    fn library(root: &Path) -> Library {
        let config = Config::parse(&format!(
            "datapath: {}\ndataformat: {{0}}_{{5}}{{6}}",
            root.display()
        ))
        .unwrap();
        let library = Library::new(&config).unwrap();
        for entry in ENTRIES {
            library.write_bibtex(&normalize_bibtex(entry).unwrap()).unwrap();
        }
        library
    }

    fn run(query: SearchQuery) -> SearchSummary {
        let dir = TempDir::new().unwrap();
        search(&library(dir.path()), &query, &SearchOptions::default()).unwrap()
    }

    #[test]
    fn test_author_search() {
        let query = SearchQuery {
            authors: vec!["bamber".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query.clone()), SearchSummary { matched: 2, queried: 3 });

        let first = SearchQuery {
            first: true,
            ..query
        };
        assert_eq!(run(first).matched, 1);
    }

    #[test]
    fn test_unicode_author_search() {
        let query = SearchQuery {
            authors: vec!["Müller".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query).matched, 1);
    }

    #[test]
    fn test_keywords_match_title_or_keywords() {
        let query = SearchQuery {
            keywords: vec!["greenland".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query).matched, 2);
    }

    #[test]
    fn test_year_journal_and_doi() {
        let query = SearchQuery {
            years: vec!["200".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query), SearchSummary { matched: 1, queried: 1 });

        let query = SearchQuery {
            journals: vec!["cryosphere".to_string(), "glaciology".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query).matched, 2);

        let query = SearchQuery {
            dois: vec!["10.1038/ngeo102".to_string()],
            ..Default::default()
        };
        assert_eq!(run(query).matched, 1);
    }

    #[test]
    fn test_export() {
        let dir = TempDir::new().unwrap();
        let library = library(&dir.path().join("library"));
        let export = dir.path().join("matches.bib");
        let options = SearchOptions {
            export: Some(export.clone()),
            ..Default::default()
        };
        let query = SearchQuery {
            authors: vec!["rignot".to_string()],
            ..Default::default()
        };
        search(&library, &query, &options).unwrap();
        let contents = fs::read_to_string(export).unwrap();
        assert!(contents.starts_with("@article{Rignot:2008ct,"));
    }
}
