use crate::doi::{crossref_url, doi_url};
use crate::error::AppError;
use crate::ui::blog;

/// Pages opened for a DOI: the resolver, then optionally the crossref.org
/// works record.
pub fn doi_pages(doi: &str, crossref: bool) -> Vec<String> {
    let mut pages = vec![doi_url(doi)];
    if crossref {
        pages.push(crossref_url(doi));
    }
    pages
}

/// Opens the webpages of each DOI in the default browser.
pub fn open_dois(dois: &[String], crossref: bool, verbose: bool) -> Result<(), AppError> {
    for doi in dois {
        for page in doi_pages(doi, crossref) {
            if verbose {
                blog!("Opening", "{}", page);
            }
            webbrowser::open(&page).map_err(|source| AppError::Open {
                target: page.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_pages() {
        assert_eq!(doi_pages("10.1038/ngeo102", false), vec!["https://doi.org/10.1038/ngeo102"]);
        assert_eq!(
            doi_pages("10.1038/ngeo102", true),
            vec![
                "https://doi.org/10.1038/ngeo102",
                "https://api.crossref.org/works/10.1038%2Fngeo102",
            ]
        );
    }
}
