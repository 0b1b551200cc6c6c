use crate::symbols;
use crc::{Crc, CRC_32_ISO_HDLC};
use rand::seq::IndexedRandom;
use std::fmt;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// A Papers2-style universal citekey, `Author:YYYYxx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CiteKey {
    pub author: String,
    pub year: String,
    pub suffix: String,
}

impl CiteKey {
    /// Stem of the BibTeX file written for this key, `Author-YYYYxx`.
    pub fn file_stem(&self) -> String {
        format!("{}-{}{}", self.author, self.year, self.suffix)
    }

    /// True when the suffix was derived from a DOI.
    pub fn is_doi_based(&self) -> bool {
        matches!(self.suffix.chars().next(), Some('b'..='k'))
    }

    /// True when the suffix was derived from a title.
    pub fn is_title_based(&self) -> bool {
        matches!(self.suffix.chars().next(), Some('t'..='w'))
    }
}

impl fmt::Display for CiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.author, self.year, self.suffix)
    }
}

/// Builds the citekey for a reference.
///
/// The suffix is a CRC32 hash of the DOI when one is given, otherwise of
/// the scrubbed title, otherwise two random letters.
pub fn generate_citekey(
    author: &str,
    year: &str,
    doi: Option<&str>,
    title: Option<&str>,
) -> CiteKey {
    let suffix = match (non_empty(doi), non_empty(title)) {
        (Some(doi), _) => doi_suffix(doi),
        (None, Some(title)) => title_suffix(title),
        (None, None) => random_suffix(),
    };
    CiteKey {
        author: author_key(author),
        year: year.to_string(),
        suffix,
    }
}

/// Plain ASCII author with whitespace, hyphens, apostrophes and braces
/// removed.
pub fn author_key(author: &str) -> String {
    symbols::to_plain(author)
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '\'' | '{' | '}'))
        .collect()
}

pub fn doi_suffix(doi: &str) -> String {
    let crc = CRC32.checksum(doi.as_bytes());
    hash_pair(b'b', crc % 260, crc)
}

pub fn title_suffix(title: &str) -> String {
    let crc = CRC32.checksum(scrub_title(title).as_bytes());
    hash_pair(b't', crc % 104, crc)
}

fn hash_pair(base: u8, bucket: u32, crc: u32) -> String {
    let first = (base + (bucket / 26) as u8) as char;
    let second = (b'a' + (crc % 26) as u8) as char;
    [first, second].iter().collect()
}

/// Lowercases the title, turns `_-=/|.{}` into spaces and keeps only ASCII
/// letters, digits and whitespace.
pub fn scrub_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '_' | '-' | '=' | '/' | '|' | '.' | '{' | '}' => ' ',
            c => c,
        })
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

fn random_suffix() -> String {
    ALPHABET
        .choose_multiple(&mut rand::rng(), 2)
        .map(|b| *b as char)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(CRC32.checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_doi_reference_key() {
        let key = generate_citekey("Rignot", "2008", Some("10.1038/ngeo102"), None);
        assert_eq!(key.to_string(), "Rignot:2008ct");
        assert_eq!(key.file_stem(), "Rignot-2008ct");
        assert!(key.is_doi_based());
    }

    #[test]
    fn test_doi_key_is_deterministic() {
        let doi = Some("10.1234/abc.222.987654");
        let first = generate_citekey("Smith", "1997", doi, None);
        for _ in 0..10 {
            assert_eq!(generate_citekey("Smith", "1997", doi, None), first);
        }
        assert_eq!(first.suffix, "jh");
    }

    #[test]
    fn test_doi_takes_priority_over_title() {
        let key = generate_citekey(
            "Rignot",
            "2008",
            Some("10.1038/ngeo102"),
            Some("Ice sheet mass balance"),
        );
        assert_eq!(key.suffix, "ct");
    }

    #[test]
    fn test_title_suffix() {
        let key = generate_citekey(
            "Bird",
            "2010",
            None,
            Some("Direct Evidence Of Flying Birds Found In Sky Pictures"),
        );
        assert_eq!(key.suffix, "wo");
        assert!(key.is_title_based());
        // braces and hyphens are scrubbed before hashing
        assert_eq!(title_suffix("{Ice-sheet mass balance}"), "uz");
        assert_eq!(title_suffix("Ice sheet mass balance"), "uz");
    }

    #[test]
    fn test_suffix_ranges() {
        let dois = [
            "10.1029/2008GL036765",
            "10.1038/ngeo102",
            "10.5194/tc-8-1509-2014",
            "10.1126/science.1228102",
        ];
        for doi in dois {
            let first = doi_suffix(doi).chars().next().unwrap();
            assert!(('b'..='k').contains(&first), "{doi}");
        }
        for title in ["a", "Greenland", "Mass balance of polar ice sheets"] {
            let first = title_suffix(title).chars().next().unwrap();
            assert!(('t'..='w').contains(&first), "{title}");
        }
    }

    #[test]
    fn test_random_suffix_letters_distinct() {
        for _ in 0..20 {
            let key = generate_citekey("Smith", "1997", None, Some("  "));
            let letters: Vec<char> = key.suffix.chars().collect();
            assert_eq!(letters.len(), 2);
            assert_ne!(letters[0], letters[1]);
            assert!(letters.iter().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_author_key_is_ascii() {
        assert_eq!(author_key("Müller"), "Muller");
        assert_eq!(author_key("van den Broeke"), "vandenBroeke");
        assert_eq!(author_key("O'Neel-Smith"), "ONeelSmith");
        assert!(author_key("Jørgensen").is_ascii());
        assert_eq!(author_key("{IMBIE Team}"), "IMBIETeam");
    }
}
