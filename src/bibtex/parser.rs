use super::names::collapse_whitespace;
use super::BibtexError;

/// An entry as it appears in the text, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub entry_type: String,
    pub key: String,
    /// Lowercased field names with whitespace-collapsed values, in input order.
    pub fields: Vec<(String, String)>,
}

impl RawEntry {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parses every `@type{key, field = value, ...}` entry in the text.
///
/// `@comment`, `@string` and `@preamble` blocks are skipped. Values may be
/// braced, quoted or bare and are joined across `#`.
pub fn parse_entries(text: &str) -> Result<Vec<RawEntry>, BibtexError> {
    let mut scanner = Scanner::new(text);
    let mut entries = Vec::new();
    while scanner.seek('@') {
        scanner.bump();
        let entry_type = scanner.take_while(|c| c.is_alphanumeric() || c == '_');
        scanner.skip_whitespace();
        let close = match scanner.peek() {
            Some('{') => '}',
            Some('(') => ')',
            _ => continue,
        };
        scanner.bump();
        let entry_type = entry_type.to_lowercase();
        if matches!(entry_type.as_str(), "comment" | "string" | "preamble") {
            scanner.skip_block(close);
            continue;
        }
        entries.push(scanner.entry_body(entry_type, close)?);
    }
    if entries.is_empty() {
        return Err(BibtexError::NoEntries);
    }
    Ok(entries)
}

/// Parses the first entry in the text.
pub fn parse_entry(text: &str) -> Result<RawEntry, BibtexError> {
    parse_entries(text)?
        .into_iter()
        .next()
        .ok_or(BibtexError::NoEntries)
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Scanner {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn seek(&mut self, target: char) -> bool {
        while let Some(c) = self.peek() {
            if c == target {
                return true;
            }
            self.pos += 1;
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !keep(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn skip_block(&mut self, close: char) {
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                c if c == close && depth == 0 => return,
                _ => {}
            }
        }
    }

    fn entry_body(&mut self, entry_type: String, close: char) -> Result<RawEntry, BibtexError> {
        let key = self
            .take_while(|c| c != ',' && c != close)
            .trim()
            .to_string();
        let unterminated = || BibtexError::ParseFailed(format!("unterminated entry '{}'", key));
        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(unterminated()),
                Some(c) if c == close => {
                    self.bump();
                    break;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                Some(_) => {}
            }
            let name = self.take_while(|c| c != '=' && c != ',' && c != close);
            match self.peek() {
                Some('=') => {
                    self.bump();
                }
                None => return Err(unterminated()),
                // stray token without a value
                Some(_) => continue,
            }
            let value = self.value(close).ok_or_else(unterminated)?;
            fields.push((name.trim().to_lowercase(), collapse_whitespace(&value)));
        }
        Ok(RawEntry {
            entry_type,
            key,
            fields,
        })
    }

    fn value(&mut self, close: char) -> Option<String> {
        let mut value = String::new();
        loop {
            self.skip_whitespace();
            match self.peek()? {
                '{' => {
                    self.bump();
                    value.push_str(&strip_outer_braces(&self.braced()?));
                }
                '"' => {
                    self.bump();
                    value.push_str(&strip_outer_braces(&self.quoted()?));
                }
                _ => {
                    let bare = self.take_while(|c| c != ',' && c != close && c != '#');
                    value.push_str(bare.trim());
                }
            }
            self.skip_whitespace();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                return Some(value);
            }
        }
    }

    // Content up to the matching close brace; the opening brace is consumed.
    fn braced(&mut self) -> Option<String> {
        let mut depth = 0usize;
        let mut out = String::new();
        loop {
            let c = self.bump()?;
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => return Some(out),
                '}' => depth -= 1,
                _ => {}
            }
            out.push(c);
        }
    }

    fn quoted(&mut self) -> Option<String> {
        let mut depth = 0usize;
        let mut out = String::new();
        let mut escaped = false;
        loop {
            let c = self.bump()?;
            match c {
                '"' if depth == 0 && !escaped => return Some(out),
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            escaped = c == '\\' && !escaped;
            out.push(c);
        }
    }
}

/// Removes one pair of braces enclosing the whole value, if present.
pub fn strip_outer_braces(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') && closes_at_end(trimmed) {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

// True when the first opening brace is closed by the final character.
fn closes_at_end(text: &str) -> bool {
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return index == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
@comment{exported from a journal page}
@Article{rignot2008,
  Author = {Rignot, Eric and Jonathan L. Bamber},
  title = {{Recent Antarctic ice mass loss from radar
           interferometry and regional climate modelling}},
  journal = "Nature Geoscience",
  year = 2008,
  month = jan,
  pages = {106 - 110},
  doi = {doi:10.1038/ngeo102},
}
"#;

    #[test]
    fn test_parse_sample_entry() {
        let entry = parse_entry(SAMPLE).unwrap();
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "rignot2008");
        assert_eq!(
            entry.fields,
            vec![
                ("author".to_string(), "Rignot, Eric and Jonathan L. Bamber".to_string()),
                (
                    "title".to_string(),
                    "Recent Antarctic ice mass loss from radar interferometry and regional climate modelling"
                        .to_string()
                ),
                ("journal".to_string(), "Nature Geoscience".to_string()),
                ("year".to_string(), "2008".to_string()),
                ("month".to_string(), "jan".to_string()),
                ("pages".to_string(), "106 - 110".to_string()),
                ("doi".to_string(), "doi:10.1038/ngeo102".to_string()),
            ]
        );
    }

    #[test]
    fn test_inner_braces_are_kept() {
        let entry = parse_entry(r#"@misc{k, title = {{NASA} report on {GRACE}}, note = "a {"} b"}"#)
            .unwrap();
        assert_eq!(entry.get("title"), Some("{NASA} report on {GRACE}"));
        assert_eq!(entry.get("note"), Some("a {\"} b"));
    }

    #[test]
    fn test_concatenation_and_parentheses() {
        let entry = parse_entry(r#"@book(k, title = "Ice" # { and } # "Snow")"#).unwrap();
        assert_eq!(entry.entry_type, "book");
        assert_eq!(entry.get("title"), Some("Ice and Snow"));
    }

    #[test]
    fn test_multiple_entries() {
        let text = "@article{a, year={2001}}\n@book{b, year={2002}}";
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].get("year"), Some("2002"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_entries("no entries here"), Err(BibtexError::NoEntries));
        assert!(matches!(
            parse_entry("@article{a, title = {never closed"),
            Err(BibtexError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_strip_outer_braces() {
        assert_eq!(strip_outer_braces("{Title}"), "Title");
        assert_eq!(strip_outer_braces("{A} and {B}"), "{A} and {B}");
        assert_eq!(strip_outer_braces("plain"), "plain");
    }
}
