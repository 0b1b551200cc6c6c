use super::DoiError;
use crate::bibtex::names::{self, AuthorName};
use crate::bibtex::{self, BibliographicRecord, EntryType, Field};
use crate::ris::month_abbreviation;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Citeproc JSON work, as served by crossref.org, datacite.org and
/// doi.org content negotiation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Work {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub author: Vec<Person>,
    #[serde(default)]
    pub editor: Vec<Person>,
    #[serde(default, deserialize_with = "text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub container_title: Option<String>,
    #[serde(default)]
    pub published_print: Option<DateParts>,
    #[serde(default)]
    pub published_online: Option<DateParts>,
    #[serde(default)]
    pub issued: Option<DateParts>,
    #[serde(default, deserialize_with = "text")]
    pub volume: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub issue: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub page: Option<String>,
    #[serde(rename = "URL", default, deserialize_with = "text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub publisher: Option<String>,
    #[serde(default)]
    pub issn_type: Vec<IssnType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Option<String>,
    #[serde(default)]
    pub literal: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateParts {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssnType {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Which name list of the work becomes the BibTeX author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AuthorField {
    #[default]
    Author,
    Editor,
}

// Accepts a string, a number or a list whose first element is used.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(value_text),
        _ => None,
    }
}

fn value_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn case_fixed(text: &str) -> String {
    if names::is_upper(text) {
        names::title_case(text)
    } else {
        text.to_string()
    }
}

impl Person {
    /// `Surname, Given`, or the braced literal name.
    pub fn formatted(&self) -> Option<String> {
        if let Some(literal) = self.literal.as_deref().filter(|l| !l.trim().is_empty()) {
            return Some(format!("{{{}}}", literal.trim()));
        }
        let family = case_fixed(self.family.as_deref()?.trim());
        let given = case_fixed(self.given.as_deref().unwrap_or_default().trim());
        Some(AuthorName::new(family, given).to_string())
    }
}

impl DateParts {
    fn parts(&self) -> Vec<u32> {
        self.date_parts
            .first()
            .map(|parts| parts.iter().map_while(value_number).collect())
            .unwrap_or_default()
    }
}

impl Work {
    pub fn entry_type(&self) -> Result<EntryType, DoiError> {
        match self.kind.as_str() {
            "journal-article" | "article" | "article-journal" => Ok(EntryType::Article),
            "book-chapter" | "chapter" => Ok(EntryType::Inbook),
            "book" | "monograph" => Ok(EntryType::Book),
            "proceedings-article" | "paper-conference" => Ok(EntryType::Inproceedings),
            "dataset" => Ok(EntryType::Misc),
            other => Err(DoiError::UnsupportedType(other.to_string())),
        }
    }

    /// Year and month, preferring the print date over online and issued.
    pub fn date(&self) -> Option<(u32, Option<u32>)> {
        [&self.published_print, &self.published_online, &self.issued]
            .into_iter()
            .flatten()
            .map(DateParts::parts)
            .find(|parts| !parts.is_empty())
            .map(|parts| (parts[0], parts.get(1).copied()))
    }

    pub fn year(&self) -> Option<String> {
        self.date().map(|(year, _)| format!("{:4}", year))
    }

    /// Family name of the first author, title-cased if written in capitals.
    pub fn first_family(&self) -> Option<String> {
        let person = self.author.first()?;
        person
            .family
            .as_deref()
            .or(person.literal.as_deref())
            .map(|family| case_fixed(family.trim()))
    }

    /// ISSN, print before electronic.
    pub fn issn(&self) -> Option<&str> {
        ["print", "electronic"].iter().find_map(|kind| {
            self.issn_type
                .iter()
                .find(|issn| issn.kind == *kind)
                .map(|issn| issn.value.as_str())
        })
    }

    /// BibTeX record for the work. Pages are only set when known.
    pub fn to_record(&self, doi: &str, author_field: AuthorField) -> Result<BibliographicRecord, DoiError> {
        let mut record = BibliographicRecord::new(self.entry_type()?);
        record.set(Field::Doi, doi);

        let people = match author_field {
            AuthorField::Author => &self.author,
            AuthorField::Editor => &self.editor,
        };
        let authors: Vec<String> = people.iter().filter_map(Person::formatted).collect();
        if authors.is_empty() {
            return Err(DoiError::MissingMetadata {
                doi: doi.to_string(),
                what: "authors",
            });
        }
        record.set(Field::Author, authors.join(" and "));

        let (year, month) = self.date().ok_or_else(|| DoiError::MissingMetadata {
            doi: doi.to_string(),
            what: "publication date",
        })?;
        record.set(Field::Year, format!("{:4}", year));
        if let Some(month) = month.and_then(|m| month_abbreviation(&m.to_string())) {
            record.set(Field::Month, month);
        }

        let optional = [
            (Field::Journal, self.container_title.as_deref()),
            (Field::Title, self.title.as_deref()),
            (Field::Volume, self.volume.as_deref()),
            (Field::Number, self.issue.as_deref()),
            (Field::Url, self.url.as_deref()),
            (Field::Issn, self.issn()),
            (Field::Publisher, self.publisher.as_deref()),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                record.set(field, value);
            }
        }

        if let Some(page) = self.page.as_deref() {
            let mut numbers = page
                .split(|c: char| !c.is_ascii_digit())
                .filter(|part| !part.is_empty());
            if let Some(start) = numbers.next() {
                record.set(Field::Pages, bibtex::format_pages(Some(start), numbers.next()));
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITEPROC: &str = r#"{
        "type": "journal-article",
        "DOI": "10.1038/ngeo102",
        "author": [
            {"given": "E.", "family": "RIGNOT", "sequence": "first"},
            {"given": "Jonathan L.", "family": "Bamber"},
            {"literal": "IMBIE Team"}
        ],
        "title": "Recent Antarctic ice mass loss from radar interferometry and regional climate modelling",
        "container-title": ["Nature Geoscience"],
        "published-online": {"date-parts": [[2008, 1, 13]]},
        "issued": {"date-parts": [[2008]]},
        "volume": "1",
        "issue": 2,
        "page": "106-110",
        "URL": "https://doi.org/10.1038/ngeo102",
        "publisher": "Springer Science and Business Media LLC",
        "ISSN": ["1752-0894", "1752-0908"],
        "issn-type": [
            {"type": "electronic", "value": "1752-0908"},
            {"type": "print", "value": "1752-0894"}
        ]
    }"#;

    fn work() -> Work {
        serde_json::from_str(CITEPROC).unwrap()
    }

    #[test]
    fn test_deserialize_flexible_fields() {
        let work = work();
        assert_eq!(work.container_title.as_deref(), Some("Nature Geoscience"));
        assert_eq!(work.issue.as_deref(), Some("2"));
        assert_eq!(work.date(), Some((2008, Some(1))));
        assert_eq!(work.issn(), Some("1752-0894"));
        assert_eq!(work.first_family().as_deref(), Some("Rignot"));
    }

    #[test]
    fn test_to_record() {
        let record = work().to_record("10.1038/ngeo102", AuthorField::Author).unwrap();
        assert_eq!(record.entry_type, EntryType::Article);
        assert_eq!(
            record.get(Field::Author),
            Some("Rignot, E and Bamber, Jonathan L and {IMBIE Team}")
        );
        assert_eq!(record.get(Field::Year), Some("2008"));
        assert_eq!(record.get(Field::Month), Some("jan"));
        assert_eq!(record.get(Field::Pages), Some("106--110"));
        assert_eq!(record.get(Field::Journal), Some("Nature Geoscience"));

        let normalized = bibtex::normalize(record).unwrap();
        assert_eq!(normalized.citekey.to_string(), "Rignot:2008ct");
        assert_eq!(
            normalized.record.get(Field::Author),
            Some("Rignot, E and Bamber, Jonathan L and {IMBIE Team}")
        );
    }

    #[test]
    fn test_missing_metadata() {
        let work: Work = serde_json::from_str(r#"{"type": "dataset", "issued": {"date-parts": [[null]]}, "author": [{"family": "Smith"}]}"#).unwrap();
        assert!(matches!(
            work.to_record("10.5067/x", AuthorField::Author),
            Err(DoiError::MissingMetadata { what: "publication date", .. })
        ));
        assert!(matches!(
            work.to_record("10.5067/x", AuthorField::Editor),
            Err(DoiError::MissingMetadata { what: "authors", .. })
        ));
    }

    #[test]
    fn test_unsupported_type() {
        let work: Work = serde_json::from_str(r#"{"type": "peer-review"}"#).unwrap();
        assert!(matches!(work.entry_type(), Err(DoiError::UnsupportedType(_))));
    }
}
