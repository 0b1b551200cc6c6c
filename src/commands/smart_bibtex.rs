use super::{emit_record, BatchReport};
use crate::bibtex::{self, NormalizedRecord};
use crate::doi::{AuthorField, DoiClient};
use crate::error::AppError;
use crate::library::Library;
use crate::ui::UI;

/// BibTeX entries built from citeproc metadata. Works for crossref.org and
/// datacite.org DOIs alike.
pub async fn smart_bibtex(
    client: &DoiClient,
    library: Option<&Library>,
    dois: &[String],
    author_field: AuthorField,
) -> Result<(), AppError> {
    let mut report = BatchReport::new();
    for doi in dois {
        let result = match fetch(client, doi, author_field).await {
            Ok(normalized) => emit_record(&normalized, library),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => report.success(doi),
            Err(err) => report.failure(doi, err),
        }
    }
    report.finish("Created")
}

async fn fetch(
    client: &DoiClient,
    doi: &str,
    author_field: AuthorField,
) -> Result<NormalizedRecord, AppError> {
    let spinner = UI::spinner("Fetching", &format!("metadata for {}", doi));
    let work = client.citeproc(doi).await;
    spinner.finish_and_clear();
    let record = work?.to_record(doi, author_field)?;
    Ok(bibtex::normalize(record)?)
}
