use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_ENV: &str = "REFERENCERC";
pub const CONFIG_FILE: &str = ".referencerc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration found at {0}. Create it with 'datapath:' and 'dataformat:' lines")]
    NotFound(PathBuf),
    #[error("Could not determine home directory")]
    NoHomeDir,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Missing '{0}' in configuration")]
    MissingKey(&'static str),
    #[error("Invalid dataformat '{format}': {reason}")]
    InvalidFormat { format: String, reason: String },
}

/// Settings shared by every library operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the year/author article tree.
    pub datapath: PathBuf,
    /// Article filename template.
    pub dataformat: DataFormat,
    /// `Full Journal Name = Abbrev.` list.
    pub abbreviations: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from `path`, or from `$REFERENCERC`, or from
    /// `~/.referencerc`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        debug!(path = %path.display(), "reading configuration");
        Self::parse(&fs::read_to_string(&path)?)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(expand(&path));
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Parses `key: value` lines. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let parameters: HashMap<&str, &str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let datapath = parameters
            .get("datapath")
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingKey("datapath"))?;
        let dataformat = parameters
            .get("dataformat")
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingKey("dataformat"))?;

        Ok(Config {
            datapath: expand(datapath),
            dataformat: DataFormat::parse(dataformat)?,
            abbreviations: parameters
                .get("abbreviations")
                .filter(|value| !value.is_empty())
                .map(|value| expand(value)),
        })
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Arg(usize),
}

/// Positional filename template.
///
/// `{0}` author, `{1}` journal, `{2}` journal abbreviation, `{3}` volume,
/// `{4}` number, `{5}` year, `{6}` extension including the dot. `{{` and
/// `}}` are literal braces.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFormat {
    source: String,
    segments: Vec<Segment>,
}

pub const FORMAT_ARGS: usize = 7;

impl DataFormat {
    pub fn parse(format: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidFormat {
            format: format.to_string(),
            reason: reason.to_string(),
        };
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut index = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(d) => index.push(d),
                            None => return Err(invalid("unclosed '{'")),
                        }
                    }
                    let index: usize = index
                        .trim()
                        .parse()
                        .map_err(|_| invalid("placeholders must be positional, like {0}"))?;
                    if index >= FORMAT_ARGS {
                        return Err(invalid("placeholders range from {0} to {6}"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Arg(index));
                }
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(DataFormat {
            source: format.to_string(),
            segments,
        })
    }

    pub fn render(&self, args: &[&str; FORMAT_ARGS]) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Arg(index) => args[*index],
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_referencerc() {
        let config = Config::parse(
            "# reference library\n\
             datapath: /data/references\n\
             \n\
             dataformat: {0}_{2}_{5}{6}\n\
             abbreviations: /data/abbrev.txt\n",
        )
        .unwrap();
        assert_eq!(config.datapath, PathBuf::from("/data/references"));
        assert_eq!(config.dataformat.as_str(), "{0}_{2}_{5}{6}");
        assert_eq!(config.abbreviations, Some(PathBuf::from("/data/abbrev.txt")));
    }

    #[test]
    fn test_missing_keys() {
        assert!(matches!(
            Config::parse("dataformat: {0}{6}"),
            Err(ConfigError::MissingKey("datapath"))
        ));
        assert!(matches!(
            Config::parse("datapath: /data"),
            Err(ConfigError::MissingKey("dataformat"))
        ));
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::parse("datapath: ~/references\ndataformat: {0}{6}").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.datapath, home.join("references"));
        }
    }

    #[test]
    fn test_render_dataformat() {
        let format = DataFormat::parse("{0}_{2}_{5}{6}").unwrap();
        let args = ["Rignot", "Nature_Geoscience", "Nat_Geosci", "1", "2", "2008", ".pdf"];
        assert_eq!(format.render(&args), "Rignot_Nat_Geosci_2008.pdf");

        let braces = DataFormat::parse("{{{0}}}{6}").unwrap();
        assert_eq!(braces.render(&args), "{Rignot}.pdf");
    }

    #[test]
    fn test_invalid_dataformat() {
        for format in ["{7}", "{author}", "{0", "0}"] {
            assert!(
                matches!(DataFormat::parse(format), Err(ConfigError::InvalidFormat { .. })),
                "{format}"
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "datapath: /tmp/refs\ndataformat: {{0}}_{{5}}{{6}}").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.dataformat.as_str(), "{0}_{5}{6}");
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/.referencerc"))),
            Err(ConfigError::NotFound(_))
        ));
    }
}
