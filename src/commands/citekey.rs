use super::BatchReport;
use crate::citekey::{generate_citekey, CiteKey};
use crate::doi::{DoiClient, DoiError};
use crate::error::AppError;
use crate::ui::UI;

/// Prints one citekey per author/year pair. DOIs and titles are matched to
/// the pairs by position.
pub fn citekeys(
    authors: &[String],
    years: &[String],
    dois: &[String],
    titles: &[String],
) -> Result<(), AppError> {
    for key in build_citekeys(authors, years, dois, titles)? {
        println!("{}", key);
    }
    Ok(())
}

fn build_citekeys(
    authors: &[String],
    years: &[String],
    dois: &[String],
    titles: &[String],
) -> Result<Vec<CiteKey>, AppError> {
    if authors.len() != years.len() {
        return Err(AppError::InvalidArguments(format!(
            "{} authors but {} years",
            authors.len(),
            years.len()
        )));
    }
    Ok(authors
        .iter()
        .zip(years)
        .enumerate()
        .map(|(index, (author, year))| {
            generate_citekey(
                author,
                year,
                dois.get(index).map(String::as_str),
                titles.get(index).map(String::as_str),
            )
        })
        .collect())
}

/// DOI-based citekeys with author and year taken from crossref.org.
pub async fn smart_citekeys(client: &DoiClient, dois: &[String]) -> Result<(), AppError> {
    let mut report = BatchReport::new();
    for doi in dois {
        match smart_citekey(client, doi).await {
            Ok(key) => {
                println!("{}", key);
                report.success(doi);
            }
            Err(err) => report.failure(doi, err),
        }
    }
    report.finish("Citekeys")
}

async fn smart_citekey(client: &DoiClient, doi: &str) -> Result<CiteKey, DoiError> {
    let spinner = UI::spinner("Fetching", &format!("crossref.org record for {}", doi));
    let work = client.crossref_work(doi).await;
    spinner.finish_and_clear();
    let work = work?;

    let missing = |what| DoiError::MissingMetadata {
        doi: doi.to_string(),
        what,
    };
    let author = work.first_family().ok_or_else(|| missing("authors"))?;
    let year = work.year().ok_or_else(|| missing("publication date"))?;
    Ok(generate_citekey(&author, &year, Some(doi), None))
}
