use super::{BibliographicRecord, Field};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

static BARE_AMPERSAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s)&").unwrap());

/// Escapes ampersands that follow whitespace.
pub fn escape_ampersands(value: &str) -> String {
    BARE_AMPERSAND.replace_all(value, r"${1}\&").into_owned()
}

/// Renders one entry: fields in priority order, `month` bare and lowercase,
/// `title` double braced, everything else single braced.
pub fn format_entry(record: &BibliographicRecord, citekey: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "@{}{{{},", record.entry_type, citekey);
    for (field, value) in record.sorted_fields() {
        let value = escape_ampersands(value);
        let _ = match field {
            Field::Month => writeln!(out, "{} = {},", field, value.to_lowercase()),
            Field::Title => writeln!(out, "{} = {{{{{}}}}},", field, value),
            _ => writeln!(out, "{} = {{{}}},", field, value),
        };
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibtex::EntryType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_entry_order_and_bracing() {
        let mut record = BibliographicRecord::new(EntryType::Article);
        record.set(Field::Keywords, "ice, radar");
        record.set(Field::Pages, "106--110");
        record.set(Field::Month, "JAN");
        record.set(Field::Year, "2008");
        record.set(Field::Journal, "Nature Geoscience");
        record.set(Field::Title, "Recent Antarctic ice mass loss");
        record.set(Field::Author, "Rignot, E and Bamber, J L");
        record.set(Field::Publisher, "Nature Publishing Group & Co");
        record.set(Field::Note, "");

        let expected = "\
@article{Rignot:2008ct,
author = {Rignot, E and Bamber, J L},
title = {{Recent Antarctic ice mass loss}},
journal = {Nature Geoscience},
year = {2008},
month = jan,
pages = {106--110},
publisher = {Nature Publishing Group \\& Co},
keywords = {ice, radar},
}
";
        assert_eq!(format_entry(&record, "Rignot:2008ct"), expected);
    }

    #[test]
    fn test_escape_ampersands() {
        assert_eq!(escape_ampersands("Ice & Snow"), r"Ice \& Snow");
        assert_eq!(escape_ampersands(r"Ice \& Snow"), r"Ice \& Snow");
        assert_eq!(escape_ampersands("AT&T"), "AT&T");
    }
}
