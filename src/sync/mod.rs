mod error;
mod remote;

pub use error::SyncError;
pub use remote::{DirectoryRemote, Remote, ScpRemote};
use remote::RemoteEntry;

use crate::library::SUPPLEMENTAL;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_MODE: u32 = 0o775;

static YEAR_DIRECTORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());

/// Why a file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferReason {
    /// The destination does not exist.
    New,
    /// The source is newer.
    Overwrite,
    /// Forced with `--clobber`.
    Clobber,
}

impl fmt::Display for TransferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TransferReason::New => "new",
            TransferReason::Overwrite => "overwrite",
            TransferReason::Clobber => "clobber",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Copy from the remote into the library instead of the reverse.
    pub pull: bool,
    /// Only print what would be copied.
    pub list: bool,
    pub verbose: bool,
    pub clobber: bool,
    pub mode: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            pull: false,
            list: false,
            verbose: false,
            clobber: false,
            mode: DEFAULT_MODE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub relative: PathBuf,
    pub source: String,
    pub destination: String,
    pub reason: TransferReason,
}

/// Outcome of one sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub transfers: Vec<Transfer>,
    pub unchanged: usize,
    pub listed_only: bool,
}

impl SyncReport {
    pub fn count(&self, reason: TransferReason) -> usize {
        self.transfers
            .iter()
            .filter(|transfer| transfer.reason == reason)
            .count()
    }
}

/// Rounds seconds down to an even number.
///
/// Some filesystems store modification times with two-second resolution.
pub fn even(seconds: i64) -> i64 {
    2 * seconds.div_euclid(2)
}

/// Decides whether a file is copied given both modification times.
pub fn transfer_reason(
    source: i64,
    destination: Option<i64>,
    clobber: bool,
) -> Option<TransferReason> {
    match destination {
        None => Some(TransferReason::New),
        Some(destination) if even(source) > even(destination) => Some(TransferReason::Overwrite),
        Some(_) if clobber => Some(TransferReason::Clobber),
        Some(_) => None,
    }
}

/// Parses an octal permission mode such as `775` or `0o775`.
pub fn parse_mode(value: &str) -> Result<u32, SyncError> {
    let digits = value.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| SyncError::InvalidMode(value.to_string()))
}

fn candidate_pattern(author: &str, year: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^(?:.*?-.*?\.bib$|{}_.*?_{}.*$)",
        regex::escape(author),
        regex::escape(year)
    ))
}

fn sorted_dirs(
    tree: &dyn Remote,
    relative: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<String>, SyncError> {
    let mut names: Vec<String> = tree
        .list_dir(relative)?
        .into_iter()
        .filter(|entry| entry.is_dir && keep(&entry.name))
        .map(|entry| entry.name)
        .collect();
    names.sort();
    Ok(names)
}

fn matching_files(entries: &[RemoteEntry], pattern: &Regex, directory: &Path) -> Vec<PathBuf> {
    let mut names: Vec<&str> = entries
        .iter()
        .filter(|entry| !entry.is_dir && pattern.is_match(&entry.name))
        .map(|entry| entry.name.as_str())
        .collect();
    names.sort_unstable();
    names.into_iter().map(|name| directory.join(name)).collect()
}

/// Relative paths of every BibTeX and article file in a library tree:
/// `*-*.bib` and `<Author>_*_<Year>*` in each year/author directory and its
/// `Supplemental` subdirectory.
pub fn candidates(tree: &dyn Remote) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for year in sorted_dirs(tree, Path::new(""), |name| YEAR_DIRECTORY.is_match(name))? {
        let year_path = PathBuf::from(&year);
        for author in sorted_dirs(tree, &year_path, |_| true)? {
            let author_path = year_path.join(&author);
            let pattern = candidate_pattern(&author, &year)?;
            let entries = tree.list_dir(&author_path)?;
            files.extend(matching_files(&entries, &pattern, &author_path));

            if entries
                .iter()
                .any(|entry| entry.is_dir && entry.name == SUPPLEMENTAL)
            {
                let supplement = author_path.join(SUPPLEMENTAL);
                let entries = tree.list_dir(&supplement)?;
                files.extend(matching_files(&entries, &pattern, &supplement));
            }
        }
    }
    Ok(files)
}

/// Mirrors the library at `datapath` to or from `remote`.
pub fn sync(
    datapath: &Path,
    remote: &dyn Remote,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let local = DirectoryRemote::new(datapath);
    let (source, destination): (&dyn Remote, &dyn Remote) = if options.pull {
        (remote, &local)
    } else {
        (&local, remote)
    };

    let mut report = SyncReport {
        listed_only: options.list,
        ..Default::default()
    };
    for relative in candidates(source)? {
        let Some(source_mtime) = source.mtime(&relative)? else {
            continue;
        };
        let destination_mtime = destination.mtime(&relative)?;
        let Some(reason) = transfer_reason(source_mtime, destination_mtime, options.clobber)
        else {
            report.unchanged += 1;
            continue;
        };

        let transfer = Transfer {
            source: source.display(&relative),
            destination: destination.display(&relative),
            relative,
            reason,
        };
        if options.list || options.verbose {
            println!("{} -->\n\t{} ({})\n", transfer.source, transfer.destination, reason);
        }
        if !options.list {
            let local_path = local.path(&transfer.relative);
            if options.pull {
                remote.download(&transfer.relative, &local_path, options.mode)?;
            } else {
                remote.upload(&local_path, &transfer.relative, options.mode)?;
            }
        }
        debug!(file = %transfer.relative.display(), %reason, "transfer");
        report.transfers.push(transfer);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    const T0: u64 = 1_200_000_000;

    fn write(root: &Path, relative: &str, contents: &str, mtime: u64) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        touch(&path, mtime);
    }

    fn touch(path: &Path, mtime: u64) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(mtime))
            .unwrap();
    }

    fn library() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "2008/Rignot/Rignot-2008ct.bib", "@article{Rignot:2008ct}", T0);
        write(root, "2008/Rignot/Rignot_Nat_Geosci_2008.pdf", "%PDF", T0);
        write(root, "2008/Rignot/Supplemental/Rignot_Nat_Geosci_2008.zip", "zip", T0);
        write(root, "2008/Rignot/notes.txt", "skip", T0);
        write(root, "2008/Rignot/Bamber_Science_2008.pdf", "skip", T0);
        write(root, "misc/Other/Other-2000aa.bib", "skip", T0);
        dir
    }

    fn relatives(report: &SyncReport) -> Vec<String> {
        report
            .transfers
            .iter()
            .map(|t| format!("{} ({})", t.relative.display(), t.reason))
            .collect()
    }

    #[test]
    fn test_even() {
        assert_eq!(even(7), 6);
        assert_eq!(even(8), 8);
        assert_eq!(even(-1), -2);
    }

    #[test]
    fn test_transfer_reason() {
        assert_eq!(transfer_reason(10, None, false), Some(TransferReason::New));
        assert_eq!(transfer_reason(12, Some(10), false), Some(TransferReason::Overwrite));
        // same two-second bucket
        assert_eq!(transfer_reason(11, Some(10), false), None);
        assert_eq!(transfer_reason(10, Some(12), false), None);
        assert_eq!(transfer_reason(10, Some(12), true), Some(TransferReason::Clobber));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("775").unwrap(), 0o775);
        assert_eq!(parse_mode("0o644").unwrap(), 0o644);
        assert!(parse_mode("999").is_err());
        assert!(parse_mode("rwx").is_err());
    }

    #[test]
    fn test_candidates() {
        let library = library();
        let files: Vec<_> = candidates(&DirectoryRemote::new(library.path()))
            .unwrap()
            .into_iter()
            .map(|path| path.display().to_string())
            .collect();
        assert_eq!(
            files,
            vec![
                "2008/Rignot/Rignot-2008ct.bib",
                "2008/Rignot/Rignot_Nat_Geosci_2008.pdf",
                "2008/Rignot/Supplemental/Rignot_Nat_Geosci_2008.zip",
            ]
        );
    }

    #[test]
    fn test_push_new_then_unchanged() {
        let library = library();
        let mirror = TempDir::new().unwrap();
        let remote = DirectoryRemote::new(mirror.path());
        let options = SyncOptions::default();

        let report = sync(library.path(), &remote, &options).unwrap();
        assert_eq!(report.count(TransferReason::New), 3);
        assert_eq!(
            fs::read_to_string(mirror.path().join("2008/Rignot/Rignot-2008ct.bib")).unwrap(),
            "@article{Rignot:2008ct}"
        );
        assert_eq!(
            remote.mtime(Path::new("2008/Rignot/Rignot-2008ct.bib")).unwrap(),
            Some(T0 as i64)
        );

        let report = sync(library.path(), &remote, &options).unwrap();
        assert!(report.transfers.is_empty());
        assert_eq!(report.unchanged, 3);
    }

    #[test]
    fn test_push_overwrite_and_clobber() {
        let library = library();
        let mirror = TempDir::new().unwrap();
        let remote = DirectoryRemote::new(mirror.path());
        sync(library.path(), &remote, &SyncOptions::default()).unwrap();

        let bib = library.path().join("2008/Rignot/Rignot-2008ct.bib");
        fs::write(&bib, "@article{Rignot:2008ct, year = {2008}}").unwrap();
        touch(&bib, T0 + 2);
        let report = sync(library.path(), &remote, &SyncOptions::default()).unwrap();
        assert_eq!(relatives(&report), vec!["2008/Rignot/Rignot-2008ct.bib (overwrite)"]);
        assert_eq!(
            fs::read_to_string(mirror.path().join("2008/Rignot/Rignot-2008ct.bib")).unwrap(),
            "@article{Rignot:2008ct, year = {2008}}"
        );

        let options = SyncOptions {
            clobber: true,
            ..Default::default()
        };
        let report = sync(library.path(), &remote, &options).unwrap();
        assert_eq!(report.count(TransferReason::Clobber), 3);
    }

    #[test]
    fn test_list_only_copies_nothing() {
        let library = library();
        let mirror = TempDir::new().unwrap();
        let options = SyncOptions {
            list: true,
            ..Default::default()
        };
        let report = sync(library.path(), &DirectoryRemote::new(mirror.path()), &options).unwrap();
        assert!(report.listed_only);
        assert_eq!(report.transfers.len(), 3);
        assert_eq!(fs::read_dir(mirror.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_pull() {
        let remote_dir = library();
        let local = TempDir::new().unwrap();
        let options = SyncOptions {
            pull: true,
            ..Default::default()
        };
        let report = sync(local.path(), &DirectoryRemote::new(remote_dir.path()), &options).unwrap();
        assert_eq!(report.count(TransferReason::New), 3);
        assert!(local
            .path()
            .join("2008/Rignot/Supplemental/Rignot_Nat_Geosci_2008.zip")
            .is_file());
        assert!(!local.path().join("2008/Rignot/notes.txt").exists());
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let mirror = TempDir::new().unwrap();
        let result = sync(
            &dir.path().join("absent"),
            &DirectoryRemote::new(mirror.path()),
            &SyncOptions::default(),
        );
        assert!(matches!(result, Err(SyncError::MissingDirectory(_))));
    }
}
