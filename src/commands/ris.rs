use super::{emit_record, read_input, remove_input, BatchReport};
use crate::bibtex;
use crate::error::AppError;
use crate::library::Library;
use crate::ris;
use crate::ui::blog_working;
use std::path::{Path, PathBuf};

/// Converts RIS exports to formatted BibTeX entries.
pub fn convert(
    library: Option<&Library>,
    files: &[PathBuf],
    cleanup: bool,
    verbose: bool,
) -> Result<(), AppError> {
    let mut report = BatchReport::new();
    for file in files {
        if verbose {
            blog_working!("Converting", "{}", file.display());
        }
        match convert_file(file, library) {
            Ok(()) => {
                report.success(file.display());
                if cleanup {
                    remove_input(file);
                }
            }
            Err(err) => report.failure(file.display(), err),
        }
    }
    report.finish("Converted")
}

fn convert_file(file: &Path, library: Option<&Library>) -> Result<(), AppError> {
    let records = ris::parse_records(&read_input(file)?)?;
    // every record is checked before anything is written
    let normalized = records
        .into_iter()
        .map(bibtex::normalize)
        .collect::<Result<Vec<_>, _>>()?;
    for record in &normalized {
        emit_record(record, library)?;
    }
    Ok(())
}
