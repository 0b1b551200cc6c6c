use crate::config::Config;
use crate::error::AppError;
use crate::sync::{self, DirectoryRemote, Remote, ScpRemote, SyncOptions, SyncReport, TransferReason};
use crate::ui::{blog_done, blog_working};
use std::path::{Path, PathBuf};

/// Mirrors the library with a mounted or local directory.
pub fn sync_directory(
    config: &Config,
    directory: &Path,
    options: &SyncOptions,
) -> Result<SyncReport, AppError> {
    run(config, &DirectoryRemote::new(directory), options)
}

/// Mirrors the library with `[user@]host:/path` over ssh.
pub fn sync_scp(
    config: &Config,
    remote: &str,
    identity: Option<PathBuf>,
    options: &SyncOptions,
) -> Result<SyncReport, AppError> {
    let remote = remote.parse::<ScpRemote>()?.with_identity(identity);
    run(config, &remote, options)
}

fn run(config: &Config, remote: &dyn Remote, options: &SyncOptions) -> Result<SyncReport, AppError> {
    let (from, to) = if options.pull {
        (remote.display(Path::new("")), config.datapath.display().to_string())
    } else {
        (config.datapath.display().to_string(), remote.display(Path::new("")))
    };
    blog_working!("Syncing", "{} --> {}", from, to);

    let report = sync::sync(&config.datapath, remote, options)?;
    let verb = if report.listed_only { "Listed" } else { "Synced" };
    blog_done!(
        verb,
        "{} new, {} overwritten, {} clobbered, {} up to date",
        report.count(TransferReason::New),
        report.count(TransferReason::Overwrite),
        report.count(TransferReason::Clobber),
        report.unchanged
    );
    Ok(report)
}
