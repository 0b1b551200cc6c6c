use super::remove_input;
use crate::doi::{DoiClient, DoiError};
use crate::error::AppError;
use crate::library::{ArticleMeta, Library};
use crate::symbols;
use crate::ui::{self, blog_done, UI};
use arboard::Clipboard;
use clap::Args;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

static URL_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?[_a-z]{1,4}=.*$").unwrap());

/// Article metadata given on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct ArticleArgs {
    /// Last name of the first author
    #[arg(short = 'A', long)]
    pub author: String,

    /// Full journal name
    #[arg(short = 'J', long)]
    pub journal: String,

    /// Publication year
    #[arg(short = 'Y', long)]
    pub year: String,

    /// Publication volume
    #[arg(long, default_value = "")]
    pub volume: String,

    /// Publication number
    #[arg(short = 'N', long, default_value = "")]
    pub number: String,
}

impl ArticleArgs {
    fn into_meta(self, extension: String, supplement: bool) -> ArticleMeta {
        ArticleMeta {
            author: self.author,
            journal: self.journal,
            year: self.year,
            volume: self.volume,
            number: self.number,
            extension,
            supplement,
        }
    }
}

/// Stores a local file in the library.
pub fn move_article(
    library: &Library,
    file: &Path,
    args: ArticleArgs,
    supplement: bool,
    cleanup: bool,
) -> Result<PathBuf, AppError> {
    let meta = args.into_meta(file_extension(file), supplement);
    store_local(library, file, &meta, cleanup)
}

/// Downloads an article into the library. Without a URL the clipboard text
/// is used.
pub async fn copy_article(
    client: &DoiClient,
    library: &Library,
    url: Option<String>,
    args: ArticleArgs,
    supplement: bool,
) -> Result<PathBuf, AppError> {
    let url = resolve_url(url)?;
    let meta = args.into_meta(url_extension(&url), supplement);
    store_remote(client, library, &url, &meta).await
}

/// Like `move_article` with the metadata taken from crossref.org.
pub async fn smart_move_article(
    client: &DoiClient,
    library: &Library,
    file: &Path,
    doi: &str,
    supplement: bool,
    cleanup: bool,
) -> Result<PathBuf, AppError> {
    let args = crossref_args(client, doi).await?;
    let meta = args.into_meta(file_extension(file), supplement);
    store_local(library, file, &meta, cleanup)
}

/// Like `copy_article` with the metadata taken from crossref.org.
pub async fn smart_copy_article(
    client: &DoiClient,
    library: &Library,
    url: Option<String>,
    doi: &str,
    supplement: bool,
) -> Result<PathBuf, AppError> {
    let url = resolve_url(url)?;
    let args = crossref_args(client, doi).await?;
    let meta = args.into_meta(url_extension(&url), supplement);
    store_remote(client, library, &url, &meta).await
}

fn store_local(
    library: &Library,
    file: &Path,
    meta: &ArticleMeta,
    cleanup: bool,
) -> Result<PathBuf, AppError> {
    let source = File::open(file).map_err(|source| AppError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    let path = library.store_article(meta, source)?;
    blog_done!("Stored", "{}", ui::tilde(&path).display());
    if cleanup {
        remove_input(file);
    }
    Ok(path)
}

async fn store_remote(
    client: &DoiClient,
    library: &Library,
    url: &str,
    meta: &ArticleMeta,
) -> Result<PathBuf, AppError> {
    client.check_connection(url).await?;
    let download = client.download(url).await?;
    let path = library.store_article(meta, download)?;
    blog_done!("Stored", "{}", ui::tilde(&path).display());
    Ok(path)
}

async fn crossref_args(client: &DoiClient, doi: &str) -> Result<ArticleArgs, AppError> {
    let spinner = UI::spinner("Fetching", &format!("crossref.org record for {}", doi));
    let work = client.crossref_work(doi).await;
    spinner.finish_and_clear();
    let work = work?;

    let missing = |what| DoiError::MissingMetadata {
        doi: doi.to_string(),
        what,
    };
    Ok(ArticleArgs {
        author: work.first_family().ok_or_else(|| missing("authors"))?,
        journal: work
            .container_title
            .as_deref()
            .map(symbols::to_plain)
            .ok_or_else(|| missing("journal"))?,
        year: work.year().ok_or_else(|| missing("publication date"))?,
        volume: work.volume.clone().unwrap_or_default(),
        number: work.issue.clone().unwrap_or_default(),
    })
}

fn resolve_url(url: Option<String>) -> Result<String, AppError> {
    let url = match url {
        Some(url) => url,
        None => {
            let mut clipboard = Clipboard::new()?;
            clipboard.get_text()?
        }
    };
    let url = url.trim().to_string();
    if url.is_empty() {
        return Err(AppError::EmptyClipboard);
    }
    Ok(url)
}

/// URL without a trailing tracking query such as `?utm=...`.
pub fn scrub_url(url: &str) -> String {
    URL_QUERY.replace(url, "").into_owned()
}

/// Extension of the last path segment of a URL, including the dot.
pub fn url_extension(url: &str) -> String {
    let scrubbed = scrub_url(url);
    Url::parse(&scrubbed)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| file_extension(Path::new(&segment)))
        .unwrap_or_default()
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scrub_url() {
        assert_eq!(
            scrub_url("https://www.nature.com/articles/ngeo102.pdf?dl=1"),
            "https://www.nature.com/articles/ngeo102.pdf"
        );
        assert_eq!(
            scrub_url("https://example.org/paper.pdf?download=true"),
            "https://example.org/paper.pdf?download=true"
        );
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://example.org/a/ngeo102.pdf?origin=ppub"), ".pdf");
        assert_eq!(url_extension("https://example.org/a/supplement.zip"), ".zip");
        assert_eq!(url_extension("https://example.org/a/view"), "");
        assert_eq!(url_extension("https://example.org"), "");
    }

    #[test]
    fn test_move_article_with_cleanup() {
        let dir = TempDir::new().unwrap();
        let config = Config::parse(&format!(
            "datapath: {}\ndataformat: {{0}}_{{1}}_{{3}}_{{5}}{{6}}",
            dir.path().join("library").display()
        ))
        .unwrap();
        let library = Library::new(&config).unwrap();
        let download = dir.path().join("ngeo102.pdf");
        fs::write(&download, "%PDF").unwrap();

        let args = ArticleArgs {
            author: "Rignot".to_string(),
            journal: "Nature Geoscience".to_string(),
            year: "2008".to_string(),
            volume: "1".to_string(),
            number: String::new(),
        };
        let path = move_article(&library, &download, args, false, true).unwrap();
        assert_eq!(
            path,
            dir.path()
                .join("library/2008/Rignot/Rignot_Nature_Geoscience_1_2008.pdf")
        );
        assert!(!download.exists());
    }
}
