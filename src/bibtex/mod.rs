mod error;
pub mod fields;
pub mod names;
pub mod parser;
pub mod writer;

pub use error::BibtexError;
pub use fields::{EntryType, Field};
pub use parser::{parse_entries, parse_entry, RawEntry};

use crate::citekey::{generate_citekey, CiteKey};
use crate::symbols;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static DOI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:doi:\s?|https?://(?:dx\.)?doi\.org/)?(10\..*)$").unwrap()
});
static PAGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s-\s(.*?)$").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// A bibliographic record keyed by the closed set of BibTeX fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographicRecord {
    pub entry_type: EntryType,
    /// Citation key found in the input, if any.
    pub key: Option<String>,
    fields: IndexMap<Field, String>,
}

impl BibliographicRecord {
    pub fn new(entry_type: EntryType) -> Self {
        BibliographicRecord {
            entry_type,
            key: None,
            fields: IndexMap::new(),
        }
    }

    /// Builds a record from a parsed entry, dropping fields outside the
    /// closed set and merging repeated `keywords`.
    pub fn from_raw(raw: &RawEntry) -> Result<Self, BibtexError> {
        let mut record = BibliographicRecord::new(raw.entry_type.parse()?);
        record.key = Some(raw.key.clone()).filter(|key| !key.is_empty());
        for (name, value) in &raw.fields {
            match name.parse::<Field>() {
                Ok(Field::Keywords) => record.push_keyword(value),
                Ok(field) => record.set(field, value),
                Err(_) => trace!(field = %name, "dropping unknown field"),
            }
        }
        Ok(record)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Stores a trimmed value; empty values remove the field.
    pub fn set(&mut self, field: Field, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if value.is_empty() {
            self.fields.shift_remove(&field);
        } else {
            self.fields.insert(field, value.to_string());
        }
    }

    pub fn push_keyword(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }
        match self.fields.get_mut(&Field::Keywords) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(keyword);
            }
            None => {
                self.fields.insert(Field::Keywords, keyword.to_string());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// Fields ordered by priority, then name.
    pub fn sorted_fields(&self) -> Vec<(Field, &str)> {
        let mut fields: Vec<_> = self.iter().collect();
        fields.sort_by_key(|(field, _)| field.sort_key());
        fields
    }
}

/// A record ready to be written, with the names derived from its first
/// author.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: BibliographicRecord,
    pub citekey: CiteKey,
    /// First author surname in combining Unicode, safe for a directory name.
    pub author_directory: String,
    /// Leading digits of the year.
    pub year_directory: String,
}

impl NormalizedRecord {
    pub fn to_bibtex(&self) -> String {
        writer::format_entry(&self.record, &self.citekey.to_string())
    }

    /// `Author-YYYYxx.bib`
    pub fn file_name(&self) -> String {
        format!("{}.bib", self.citekey.file_stem())
    }
}

/// Brings a record into canonical form and computes its citekey.
///
/// Author and editor lists become `Surname, Given`, author, editor, title
/// and journal are stored in LaTeX form, the DOI loses any resolver prefix
/// and `a - b` page ranges become `a--b`.
pub fn normalize(mut record: BibliographicRecord) -> Result<NormalizedRecord, BibtexError> {
    let author = record.get(Field::Author).ok_or_else(|| BibtexError::MissingField {
        field: Field::Author.to_string(),
    })?;
    let year = record
        .get(Field::Year)
        .ok_or_else(|| BibtexError::MissingField {
            field: Field::Year.to_string(),
        })?
        .to_string();
    let year_directory = DIGITS
        .find(&year)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| BibtexError::InvalidField {
            field: Field::Year.to_string(),
            reason: format!("no digits in '{}'", year),
        })?;

    let author = format_people(author);
    let surname = names::first_surname(&author);
    record.set(Field::Author, symbols::to_latex(&author));
    if let Some(editor) = record.get(Field::Editor) {
        let editor = symbols::to_latex(&format_people(editor));
        record.set(Field::Editor, editor);
    }
    for field in [Field::Title, Field::Journal] {
        if let Some(value) = record.get(field) {
            let value = symbols::to_latex(&names::collapse_whitespace(value));
            record.set(field, value);
        }
    }
    if let Some(doi) = record.get(Field::Doi) {
        let doi = extract_doi(doi);
        record.set(Field::Doi, doi);
    }
    if let Some(pages) = record.get(Field::Pages) {
        let pages = normalize_page_range(pages);
        record.set(Field::Pages, pages);
    }

    let citekey = generate_citekey(
        &symbols::latex_to_plain(&surname),
        year.trim(),
        record.get(Field::Doi),
        record.get(Field::Title),
    );
    let author_directory = directory_name(&surname);
    debug!(%citekey, %author_directory, %year_directory, "normalized record");

    Ok(NormalizedRecord {
        record,
        citekey,
        author_directory,
        year_directory,
    })
}

/// Parses and normalizes the first entry of a BibTeX text.
pub fn normalize_bibtex(text: &str) -> Result<NormalizedRecord, BibtexError> {
    let raw = parse_entry(text)?;
    normalize(BibliographicRecord::from_raw(&raw)?)
}

// Reorders a name list, title-casing names written entirely in upper case.
fn format_people(value: &str) -> String {
    let people = if names::is_upper(value) {
        names::split_names(value)
            .into_iter()
            .map(names::title_case)
            .collect::<Vec<_>>()
            .join(" and ")
    } else {
        value.to_string()
    };
    names::format_name_list(&people)
}

/// Author directory name: combining Unicode, whitespace as `_`, no hyphens,
/// apostrophes or braces.
pub fn directory_name(surname: &str) -> String {
    let combined = symbols::to_combining(&symbols::latex_to_combining(surname));
    combined
        .chars()
        .filter(|c| !matches!(c, '-' | '\'' | '{' | '}'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Strips a `doi:` or resolver URL prefix, keeping the `10.` suffix.
pub fn extract_doi(value: &str) -> String {
    let value = value.trim();
    DOI_PREFIX
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| value.to_string(), |m| m.as_str().to_string())
}

/// Rewrites `a - b` as `a--b`; other values are kept.
pub fn normalize_page_range(value: &str) -> String {
    match PAGE_RANGE.captures(value) {
        Some(caps) => format!("{}--{}", &caps[1], &caps[2]),
        None => value.to_string(),
    }
}

/// Page field from separate start and end pages.
pub fn format_pages(start: Option<&str>, end: Option<&str>) -> String {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());
    match (start, end) {
        (Some(start), Some(end)) => format!("{}--{}", start, end),
        (Some(start), None) => start.to_string(),
        (None, Some(end)) => format!("n/a--{}", end),
        (None, None) => "n/a--n/a".to_string(),
    }
}
