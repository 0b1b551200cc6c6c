use super::LibraryError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Journal name to abbreviation lookup, read from `Full Name = Abbrev.`
/// lines.
#[derive(Debug, Clone, Default)]
pub struct Abbreviations {
    entries: HashMap<String, String>,
}

impl Abbreviations {
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let contents = fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(name, abbreviation)| (normalize(name), abbreviation.trim().to_string()))
            .filter(|(name, abbreviation)| !name.is_empty() && !abbreviation.is_empty())
            .collect();
        Abbreviations { entries }
    }

    /// Case and whitespace insensitive lookup.
    pub fn get(&self, journal: &str) -> Option<&str> {
        self.entries.get(&normalize(journal)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
