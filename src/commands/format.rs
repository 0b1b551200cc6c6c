use super::{emit_record, read_input, remove_input, BatchReport};
use crate::bibtex;
use crate::error::AppError;
use crate::library::Library;
use crate::ui::blog_working;
use std::path::{Path, PathBuf};

/// Rewrites raw BibTeX files in canonical form with universal citekeys.
pub fn format(
    library: Option<&Library>,
    files: &[PathBuf],
    cleanup: bool,
    verbose: bool,
) -> Result<(), AppError> {
    let mut report = BatchReport::new();
    for file in files {
        if verbose {
            blog_working!("Formatting", "{}", file.display());
        }
        match format_file(file, library) {
            Ok(()) => {
                report.success(file.display());
                if cleanup {
                    remove_input(file);
                }
            }
            Err(err) => report.failure(file.display(), err),
        }
    }
    report.finish("Formatted")
}

fn format_file(file: &Path, library: Option<&Library>) -> Result<(), AppError> {
    let normalized = bibtex::normalize_bibtex(&read_input(file)?)?;
    emit_record(&normalized, library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn library(root: &Path) -> Library {
        let config = Config::parse(&format!(
            "datapath: {}\ndataformat: {{0}}_{{2}}_{{5}}{{6}}",
            root.display()
        ))
        .unwrap();
        Library::new(&config).unwrap()
    }

    #[test]
    fn test_format_into_library_with_cleanup() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("download.bib");
        fs::write(
            &input,
            "@article{x, author = {Eric Rignot}, year = {2008},\n  doi = {10.1038/ngeo102}}\n",
        )
        .unwrap();
        let library = library(&dir.path().join("library"));

        format(Some(&library), &[input.clone()], true, false).unwrap();
        assert!(!input.exists());
        let written = dir.path().join("library/2008/Rignot/Rignot-2008ct.bib");
        assert!(fs::read_to_string(written)
            .unwrap()
            .starts_with("@article{Rignot:2008ct,\n"));
    }

    #[test]
    fn test_failed_inputs_are_kept() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.bib");
        let bad = dir.path().join("bad.bib");
        fs::write(&good, "@article{x, author = {Smith, J}, year = {1997}}").unwrap();
        fs::write(&bad, "@article{x, title = {No author}}").unwrap();
        let library = library(&dir.path().join("library"));

        let result = format(Some(&library), &[good.clone(), bad.clone()], true, false);
        assert!(matches!(result, Err(AppError::Batch { failed: 1, total: 2 })));
        assert!(!good.exists());
        assert!(bad.exists());
    }
}
