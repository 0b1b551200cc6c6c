use super::BibtexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of fields kept in a normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Address,
    Affiliation,
    Annote,
    Author,
    Booktitle,
    Chapter,
    Crossref,
    Doi,
    Edition,
    Editor,
    Howpublished,
    Institution,
    Isbn,
    Issn,
    Journal,
    Key,
    Keywords,
    Month,
    Note,
    Number,
    Organization,
    Pages,
    Publisher,
    School,
    Series,
    Title,
    Type,
    Url,
    Volume,
    Year,
}

impl Field {
    pub const ALL: [Field; 30] = [
        Field::Address,
        Field::Affiliation,
        Field::Annote,
        Field::Author,
        Field::Booktitle,
        Field::Chapter,
        Field::Crossref,
        Field::Doi,
        Field::Edition,
        Field::Editor,
        Field::Howpublished,
        Field::Institution,
        Field::Isbn,
        Field::Issn,
        Field::Journal,
        Field::Key,
        Field::Keywords,
        Field::Month,
        Field::Note,
        Field::Number,
        Field::Organization,
        Field::Pages,
        Field::Publisher,
        Field::School,
        Field::Series,
        Field::Title,
        Field::Type,
        Field::Url,
        Field::Volume,
        Field::Year,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Address => "address",
            Field::Affiliation => "affiliation",
            Field::Annote => "annote",
            Field::Author => "author",
            Field::Booktitle => "booktitle",
            Field::Chapter => "chapter",
            Field::Crossref => "crossref",
            Field::Doi => "doi",
            Field::Edition => "edition",
            Field::Editor => "editor",
            Field::Howpublished => "howpublished",
            Field::Institution => "institution",
            Field::Isbn => "isbn",
            Field::Issn => "issn",
            Field::Journal => "journal",
            Field::Key => "key",
            Field::Keywords => "keywords",
            Field::Month => "month",
            Field::Note => "note",
            Field::Number => "number",
            Field::Organization => "organization",
            Field::Pages => "pages",
            Field::Publisher => "publisher",
            Field::School => "school",
            Field::Series => "series",
            Field::Title => "title",
            Field::Type => "type",
            Field::Url => "url",
            Field::Volume => "volume",
            Field::Year => "year",
        }
    }

    /// Output position; ties are broken by field name.
    pub fn priority(&self) -> u8 {
        match self {
            Field::Author => 0,
            Field::Title => 1,
            Field::Journal => 2,
            Field::Year => 3,
            Field::Month => 4,
            Field::Volume => 5,
            Field::Number => 6,
            Field::Issn => 7,
            Field::Isbn => 8,
            Field::Url => 9,
            Field::Doi => 10,
            Field::Pages => 11,
            Field::Booktitle => 12,
            Field::Chapter => 13,
            Field::Publisher => 14,
            Field::Address => 15,
            Field::Affiliation => 16,
            Field::Institution | Field::Organization => 17,
            Field::School => 18,
            Field::Edition => 19,
            Field::Series => 20,
            Field::Editor => 21,
            Field::Howpublished => 22,
            Field::Note => 23,
            Field::Key => 24,
            Field::Annote => 25,
            Field::Type => 26,
            Field::Crossref => 27,
            Field::Keywords => 28,
        }
    }

    pub fn sort_key(&self) -> (u8, &'static str) {
        (self.priority(), self.name())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = BibtexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Field::ALL
            .iter()
            .find(|field| field.name() == lower)
            .copied()
            .ok_or_else(|| BibtexError::InvalidField {
                field: s.to_string(),
                reason: "not a recognized BibTeX field".to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    Conference,
    Inbook,
    Incollection,
    Inproceedings,
    Manual,
    Mastersthesis,
    Misc,
    Phdthesis,
    Proceedings,
    Techreport,
    Unpublished,
    Webpage,
}

impl EntryType {
    pub const ALL: [EntryType; 15] = [
        EntryType::Article,
        EntryType::Book,
        EntryType::Booklet,
        EntryType::Conference,
        EntryType::Inbook,
        EntryType::Incollection,
        EntryType::Inproceedings,
        EntryType::Manual,
        EntryType::Mastersthesis,
        EntryType::Misc,
        EntryType::Phdthesis,
        EntryType::Proceedings,
        EntryType::Techreport,
        EntryType::Unpublished,
        EntryType::Webpage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntryType::Article => "article",
            EntryType::Book => "book",
            EntryType::Booklet => "booklet",
            EntryType::Conference => "conference",
            EntryType::Inbook => "inbook",
            EntryType::Incollection => "incollection",
            EntryType::Inproceedings => "inproceedings",
            EntryType::Manual => "manual",
            EntryType::Mastersthesis => "mastersthesis",
            EntryType::Misc => "misc",
            EntryType::Phdthesis => "phdthesis",
            EntryType::Proceedings => "proceedings",
            EntryType::Techreport => "techreport",
            EntryType::Unpublished => "unpublished",
            EntryType::Webpage => "webpage",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryType {
    type Err = BibtexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        EntryType::ALL
            .iter()
            .find(|kind| kind.name() == lower)
            .copied()
            .ok_or_else(|| BibtexError::UnknownEntryType(s.to_string()))
    }
}
