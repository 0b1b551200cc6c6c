//! RIS (`TAG  - value`) records to BibTeX records.

use crate::bibtex::names::{self, AuthorName};
use crate::bibtex::{self, BibliographicRecord, EntryType, Field};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::trace;

static RIS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][A-Z0-9]{1,2})\s+-(?:\s+(.*?))?\s*$").unwrap());
static DOI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:doi:\s?|https?://(?:dx\.)?doi\.org/)?(10\.\S*)").unwrap()
});
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

#[derive(Error, Debug, PartialEq)]
pub enum RisError {
    #[error("No RIS records found")]
    NoRecords,

    #[error("RIS record has no TY (reference type) line")]
    MissingType,

    #[error("Unsupported RIS reference type '{0}'")]
    UnknownType(String),
}

fn entry_type(ty: &str) -> Result<EntryType, RisError> {
    match ty.trim().to_uppercase().as_str() {
        "JOUR" | "EJOU" => Ok(EntryType::Article),
        "BOOK" => Ok(EntryType::Book),
        "CHAP" => Ok(EntryType::Inbook),
        "CONF" => Ok(EntryType::Proceedings),
        "RPRT" => Ok(EntryType::Techreport),
        "THES" => Ok(EntryType::Phdthesis),
        other => Err(RisError::UnknownType(other.to_string())),
    }
}

fn mapped_field(tag: &str) -> Option<Field> {
    match tag {
        "JF" | "JO" | "T2" => Some(Field::Journal),
        "VL" => Some(Field::Volume),
        "IS" => Some(Field::Number),
        "PB" => Some(Field::Publisher),
        "SN" => Some(Field::Issn),
        "UR" => Some(Field::Url),
        _ => None,
    }
}

#[derive(Default)]
struct Builder {
    entry_type: Option<EntryType>,
    record: Vec<(Field, String)>,
    authors: Vec<String>,
    editors: Vec<String>,
    keywords: Vec<String>,
    start_page: Option<String>,
    end_page: Option<String>,
}

impl Builder {
    fn is_empty(&self) -> bool {
        self.entry_type.is_none() && self.record.is_empty() && self.authors.is_empty()
    }

    fn line(&mut self, tag: &str, value: &str) -> Result<(), RisError> {
        if let Some(field) = mapped_field(tag) {
            self.record.push((field, value.to_string()));
            return Ok(());
        }
        match tag {
            "TY" => self.entry_type = Some(entry_type(value)?),
            "TI" | "T1" => self.record.push((Field::Title, value.to_string())),
            "AU" | "A1" | "A2" => self.authors.push(person(value)),
            "ED" => self.editors.push(person(value)),
            "PY" | "Y1" => {
                let mut parts = NUMBER.find_iter(value).map(|m| m.as_str());
                if let Some(year) = parts.next() {
                    self.record.push((Field::Year, year.to_string()));
                }
                if let Some(month) = parts.next().and_then(month_abbreviation) {
                    self.record.push((Field::Month, month));
                }
            }
            "SP" => {
                let mut pages = NUMBER.find_iter(value).map(|m| m.as_str().to_string());
                if let Some(start) = pages.next() {
                    self.start_page = Some(start);
                    if let Some(end) = pages.next() {
                        self.end_page = Some(end);
                    }
                }
            }
            "EP" | "LP" if NUMBER.is_match(value) => self.end_page = Some(value.to_string()),
            "L3" | "DO" | "N1" | "M3" | "DOI" => {
                if let Some(doi) = DOI.captures(value).and_then(|caps| caps.get(1)) {
                    self.record.push((Field::Doi, doi.as_str().to_string()));
                }
            }
            "KW" => self.keywords.push(value.to_string()),
            _ => trace!(tag, value, "ignoring RIS field"),
        }
        Ok(())
    }

    fn finish(self) -> Result<BibliographicRecord, RisError> {
        let mut record = BibliographicRecord::new(self.entry_type.ok_or(RisError::MissingType)?);
        for (field, value) in self.record {
            record.set(field, value);
        }
        record.set(Field::Author, self.authors.join(" and "));
        record.set(Field::Editor, self.editors.join(" and "));
        for keyword in &self.keywords {
            record.push_keyword(keyword);
        }
        record.set(
            Field::Pages,
            bibtex::format_pages(self.start_page.as_deref(), self.end_page.as_deref()),
        );
        Ok(record)
    }
}

// One RIS name per line; upper-case names are title-cased first.
fn person(value: &str) -> String {
    let value = if names::is_upper(value) {
        names::title_case(value)
    } else {
        value.to_string()
    };
    AuthorName::parse(&value).to_string()
}

/// `3` becomes `mar`.
pub fn month_abbreviation(number: &str) -> Option<String> {
    let number: u8 = number.parse().ok()?;
    let month = chrono::Month::try_from(number).ok()?;
    Some(month.name()[..3].to_lowercase())
}

/// Parses every record of an RIS text. Records are closed by `ER`.
pub fn parse_records(text: &str) -> Result<Vec<BibliographicRecord>, RisError> {
    let mut records = Vec::new();
    let mut builder = Builder::default();
    for line in text.lines() {
        let Some(caps) = RIS_LINE.captures(line.trim_start_matches('\u{feff}')) else {
            continue;
        };
        let tag = &caps[1];
        let value = caps.get(2).map_or("", |m| m.as_str()).trim();
        if tag == "ER" {
            records.push(std::mem::take(&mut builder).finish()?);
            continue;
        }
        builder.line(tag, value)?;
    }
    if !builder.is_empty() {
        records.push(builder.finish()?);
    }
    if records.is_empty() {
        return Err(RisError::NoRecords);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_record(text: &str) -> Result<BibliographicRecord, RisError> {
        parse_records(text).map(|records| records.into_iter().next().unwrap())
    }

    const RIS: &str = "\
TY  - JOUR
AU  - Rignot, Eric
AU  - BAMBER, J.L.
A2  - Michiel van den Broeke
TI  - Recent Antarctic ice mass loss from radar interferometry and regional climate modelling
JO  - Nature Geoscience
PY  - 2008/01/20
VL  - 1
IS  - 2
SP  - 106
EP  - 110
DO  - http://dx.doi.org/10.1038/ngeo102
KW  - Antarctica
KW  - ice sheets
AB  - An abstract that is not kept.
ER  -
";

    #[test]
    fn test_parse_record() {
        let record = parse_record(RIS).unwrap();
        assert_eq!(record.entry_type, EntryType::Article);
        assert_eq!(
            record.get(Field::Author),
            Some("Rignot, Eric and Bamber, J L and van den Broeke, Michiel")
        );
        assert_eq!(record.get(Field::Year), Some("2008"));
        assert_eq!(record.get(Field::Month), Some("jan"));
        assert_eq!(record.get(Field::Pages), Some("106--110"));
        assert_eq!(record.get(Field::Doi), Some("10.1038/ngeo102"));
        assert_eq!(record.get(Field::Keywords), Some("Antarctica, ice sheets"));
        assert_eq!(record.get(Field::Number), Some("2"));
    }

    #[test]
    fn test_ris_to_bibtex() {
        let record = parse_record(RIS).unwrap();
        let normalized = bibtex::normalize(record).unwrap();
        assert_eq!(normalized.citekey.to_string(), "Rignot:2008ct");
        let text = normalized.to_bibtex();
        assert!(text.starts_with("@article{Rignot:2008ct,\nauthor = {Rignot, Eric"));
        assert!(text.contains("month = jan,\n"));
    }

    #[test]
    fn test_missing_pages() {
        let record = parse_record("TY  - BOOK\nAU  - Smith, A\nPY  - 1999\nER  - \n").unwrap();
        assert_eq!(record.entry_type, EntryType::Book);
        assert_eq!(record.get(Field::Pages), Some("n/a--n/a"));
        assert_eq!(record.get(Field::Month), None);
    }

    #[test]
    fn test_start_page_with_range() {
        let record = parse_record("TY  - CHAP\nAU  - Smith, A\nSP  - 12-19\n").unwrap();
        assert_eq!(record.entry_type, EntryType::Inbook);
        assert_eq!(record.get(Field::Pages), Some("12--19"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_records("not ris"), Err(RisError::NoRecords));
        assert_eq!(
            parse_records("TY  - GEN\nER  - \n"),
            Err(RisError::UnknownType("GEN".to_string()))
        );
        assert_eq!(parse_records("AU  - Smith, A\nER  - \n"), Err(RisError::MissingType));
    }

    #[test]
    fn test_month_abbreviation() {
        assert_eq!(month_abbreviation("03").as_deref(), Some("mar"));
        assert_eq!(month_abbreviation("12").as_deref(), Some("dec"));
        assert_eq!(month_abbreviation("13"), None);
    }

    #[test]
    fn test_multiple_records() {
        let text = format!("{}{}", RIS, "TY  - RPRT\nAU  - Jones, B\nPY  - 2001\nER  - \n");
        let records = parse_records(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].entry_type, EntryType::Techreport);
    }
}
