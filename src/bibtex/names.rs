use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static NAME_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+and\s+").unwrap());

// Particles that open a compound surname, tried in order. The first one found
// after a word boundary marks the start of the surname.
static COMPOUND_SURNAMES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)\s(van)\s", r"(?i)\s(von)\s", r"(?i)\s(de)\s", r"(?i)\s(la|los)\s"]
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

static INITIALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\p{Lu}\.)+$").unwrap());

/// A personal name split into family and given parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub family: String,
    pub given: String,
}

impl AuthorName {
    /// Splits a free-text name.
    ///
    /// A fully braced name such as `{IMBIE Team}` is kept whole. Names
    /// already written as `Surname, Given` are split at the first comma.
    /// Otherwise a compound-surname particle starts the surname, falling back
    /// to the last word.
    pub fn parse(name: &str) -> Self {
        let name = collapse_whitespace(name);
        if is_braced(&name) {
            return AuthorName {
                family: name,
                given: String::new(),
            };
        }
        let (family, given) = match name.split_once(',') {
            Some((family, given)) => (family.trim().to_string(), given.trim().to_string()),
            None => split_free_text(&name),
        };
        AuthorName {
            family,
            given: split_initials(&given),
        }
    }

    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        AuthorName {
            family: family.into(),
            given: split_initials(&given.into()),
        }
    }
}

impl fmt::Display for AuthorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.given.is_empty() {
            write!(f, "{}", self.family)
        } else {
            write!(f, "{}, {}", self.family, self.given)
        }
    }
}

// True when the opening brace is closed by the last character.
fn is_braced(name: &str) -> bool {
    if !name.starts_with('{') {
        return false;
    }
    let mut depth = 0usize;
    for (index, c) in name.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return index == name.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn split_free_text(name: &str) -> (String, String) {
    for pattern in COMPOUND_SURNAMES.iter() {
        if let Some(particle) = pattern.captures(name).and_then(|caps| caps.get(1)) {
            let start = particle.start();
            return (name[start..].to_string(), name[..start].trim_end().to_string());
        }
    }
    match name.rsplit_once(' ') {
        Some((given, family)) => (family.to_string(), given.to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// Removes the periods of initials and separates them with spaces:
/// `J.K.` becomes `J K` and `John K.` becomes `John K`.
pub fn split_initials(given: &str) -> String {
    given
        .split_whitespace()
        .map(|token| {
            if INITIALS.is_match(token) {
                token
                    .split('.')
                    .filter(|letter| !letter.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits an author or editor list on ` and `.
pub fn split_names(value: &str) -> Vec<&str> {
    NAME_SEPARATOR
        .split(value.trim())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Reorders every name of a list into `Surname, Given` form.
pub fn format_name_list(value: &str) -> String {
    split_names(value)
        .into_iter()
        .map(|name| AuthorName::parse(name).to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Surname of the first author of a name list.
pub fn first_surname(value: &str) -> String {
    split_names(value)
        .first()
        .map(|name| AuthorName::parse(name).family)
        .unwrap_or_default()
}

/// True when the text has cased letters and none of them is lower case.
pub fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

/// Capitalizes the first letter of every word and lowercases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased && !previous_cased {
            out.extend(c.to_uppercase());
        } else if cased {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        previous_cased = cased;
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(
            AuthorName::parse("Eric Rignot"),
            AuthorName::new("Rignot", "Eric")
        );
        assert_eq!(AuthorName::parse("Plato").to_string(), "Plato");
    }

    #[test]
    fn test_compound_surnames() {
        assert_eq!(
            AuthorName::parse("Michiel van den Broeke").to_string(),
            "van den Broeke, Michiel"
        );
        assert_eq!(
            AuthorName::parse("Ludwig von Mises").to_string(),
            "von Mises, Ludwig"
        );
        assert_eq!(
            AuthorName::parse("Juan de la Cruz").to_string(),
            "de la Cruz, Juan"
        );
        assert_eq!(
            AuthorName::parse("Maria los Santos").to_string(),
            "los Santos, Maria"
        );
        // particle as the leading word is part of the given name split
        assert_eq!(AuthorName::parse("van Gogh").to_string(), "Gogh, van");
    }

    #[test]
    fn test_braced_names_are_kept() {
        assert_eq!(
            AuthorName::parse("{IMBIE Team}").to_string(),
            "{IMBIE Team}"
        );
        assert_eq!(
            AuthorName::parse("{Smith, Inc}").to_string(),
            "{Smith, Inc}"
        );
        assert_eq!(
            AuthorName::parse("{NASA} Goddard").to_string(),
            "Goddard, {NASA}"
        );
    }

    #[test]
    fn test_initials() {
        assert_eq!(split_initials("J.K."), "J K");
        assert_eq!(split_initials("John K."), "John K");
        assert_eq!(split_initials("J."), "J");
        assert_eq!(split_initials("J. K."), "J K");
        assert_eq!(split_initials("Mary Ann"), "Mary Ann");
        assert_eq!(AuthorName::parse("J.K. Rowling").to_string(), "Rowling, J K");
    }

    #[test]
    fn test_comma_names_are_idempotent() {
        let once = format_name_list("Rignot, E. and Michiel van den Broeke");
        assert_eq!(once, "Rignot, E and van den Broeke, Michiel");
        assert_eq!(format_name_list(&once), once);
    }

    #[test]
    fn test_split_names_case_insensitive() {
        assert_eq!(
            split_names("A Smith AND B Jones\n and C Brown"),
            vec!["A Smith", "B Jones", "C Brown"]
        );
        // "and" inside a name is not a separator
        assert_eq!(split_names("Alexander Anderson"), vec!["Alexander Anderson"]);
    }

    #[test]
    fn test_first_surname() {
        assert_eq!(first_surname("van den Broeke, M and Rignot, E"), "van den Broeke");
        assert_eq!(first_surname("Plato"), "Plato");
        assert_eq!(first_surname("Plato and Jowett, Benjamin"), "Plato");
        assert_eq!(first_surname("{IMBIE Team} and Smith, J"), "{IMBIE Team}");
    }

    #[test]
    fn test_upper_case_names() {
        assert!(is_upper("RIGNOT, E AND O'NEIL, J"));
        assert!(!is_upper("Rignot, E"));
        assert!(!is_upper("1234"));
        assert_eq!(title_case("RIGNOT, E AND O'NEIL, J"), "Rignot, E And O'Neil, J");
        assert_eq!(title_case("MÜLLER"), "Müller");
    }
}
