use super::error::{io_error, SyncError};
use crate::ui;
use std::fs::{self, DirBuilder, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tracing::{debug, trace};

const CONNECT_TIMEOUT: &str = "ConnectTimeout=20";
const CONTROL_PERSIST: &str = "ControlPersist=60";

/// One name inside a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A library tree on the other side of a sync.
///
/// Paths handed to a remote are relative to its root. Modification times
/// are whole seconds since the epoch.
pub trait Remote {
    /// Printable location of a relative path.
    fn display(&self, relative: &Path) -> String;

    fn list_dir(&self, relative: &Path) -> Result<Vec<RemoteEntry>, SyncError>;

    /// `None` when the path does not exist.
    fn mtime(&self, relative: &Path) -> Result<Option<i64>, SyncError>;

    /// Copies a local file to `relative`, creating parent directories with
    /// `mode`, then applies `mode` and the local modification time.
    fn upload(&self, local: &Path, relative: &Path, mode: u32) -> Result<(), SyncError>;

    /// Copies `relative` to a local file, keeping its modification time.
    fn download(&self, relative: &Path, local: &Path, mode: u32) -> Result<(), SyncError>;
}

/// A mounted or local directory.
#[derive(Debug, Clone)]
pub struct DirectoryRemote {
    root: PathBuf,
}

impl DirectoryRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryRemote { root: root.into() }
    }

    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

impl Remote for DirectoryRemote {
    fn display(&self, relative: &Path) -> String {
        ui::tilde(&self.path(relative)).display().to_string()
    }

    fn list_dir(&self, relative: &Path) -> Result<Vec<RemoteEntry>, SyncError> {
        let directory = self.path(relative);
        if !directory.is_dir() {
            return Err(SyncError::MissingDirectory(directory));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&directory).map_err(io_error(&directory))? {
            let path = entry.map_err(io_error(&directory))?.path();
            if let Some(name) = path.file_name() {
                entries.push(RemoteEntry {
                    name: name.to_string_lossy().into_owned(),
                    is_dir: path.is_dir(),
                });
            }
        }
        Ok(entries)
    }

    fn mtime(&self, relative: &Path) -> Result<Option<i64>, SyncError> {
        let path = self.path(relative);
        match fs::metadata(&path) {
            Ok(metadata) => {
                let modified = metadata.modified().map_err(io_error(&path))?;
                Ok(Some(epoch_seconds(modified)))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn upload(&self, local: &Path, relative: &Path, mode: u32) -> Result<(), SyncError> {
        copy_file(local, &self.path(relative), mode)
    }

    fn download(&self, relative: &Path, local: &Path, mode: u32) -> Result<(), SyncError> {
        copy_file(&self.path(relative), local, mode)
    }
}

/// A `[user@]host:/path` tree reached through the system `ssh` client.
///
/// Authentication (keys, agent or password prompt) is left to ssh itself.
/// Every command of a run shares one master connection, whose control
/// socket lives in a private temporary directory and is closed on drop.
#[derive(Debug)]
pub struct ScpRemote {
    destination: String,
    root: PathBuf,
    identity: Option<PathBuf>,
    control: TempDir,
}

impl ScpRemote {
    pub fn with_identity(mut self, identity: Option<PathBuf>) -> Self {
        self.identity = identity;
        self
    }

    fn remote_path(&self, relative: &Path) -> String {
        self.root.join(relative).to_string_lossy().into_owned()
    }

    fn control_option(&self) -> String {
        format!("ControlPath={}", self.control.path().join("%C").display())
    }

    fn ssh(&self, script: &str) -> Command {
        let mut command = Command::new("ssh");
        command
            .arg("-o")
            .arg(CONNECT_TIMEOUT)
            .arg("-o")
            .arg("ControlMaster=auto")
            .arg("-o")
            .arg(self.control_option())
            .arg("-o")
            .arg(CONTROL_PERSIST);
        if let Some(identity) = &self.identity {
            command.arg("-i").arg(identity);
        }
        command.arg(&self.destination).arg(script);
        trace!(destination = %self.destination, script, "ssh");
        command
    }

    fn run(&self, script: &str) -> Result<Output, SyncError> {
        let output = self
            .ssh(script)
            .stdin(Stdio::inherit())
            .output()
            .map_err(|source| SyncError::Spawn {
                program: "ssh",
                source,
            })?;
        check_output(output)
    }
}

impl Drop for ScpRemote {
    fn drop(&mut self) {
        // a master only exists once a command has connected
        let connected = fs::read_dir(self.control.path())
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if !connected {
            return;
        }
        let status = Command::new("ssh")
            .arg("-o")
            .arg(self.control_option())
            .arg("-O")
            .arg("exit")
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        trace!(destination = %self.destination, ?status, "closed ssh master");
    }
}

impl FromStr for ScpRemote {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((destination, root)) if !destination.is_empty() && !root.is_empty() => {
                let control = tempfile::Builder::new()
                    .prefix("reftk-ssh")
                    .tempdir()
                    .map_err(io_error(&std::env::temp_dir()))?;
                Ok(ScpRemote {
                    destination: destination.to_string(),
                    root: PathBuf::from(root),
                    identity: None,
                    control,
                })
            }
            _ => Err(SyncError::InvalidRemote(s.to_string())),
        }
    }
}

impl Remote for ScpRemote {
    fn display(&self, relative: &Path) -> String {
        format!("{}:{}", self.destination, self.remote_path(relative))
    }

    fn list_dir(&self, relative: &Path) -> Result<Vec<RemoteEntry>, SyncError> {
        let output = self.run(&format!("ls -1Ap -- {}", shell_quote(&self.remote_path(relative))))?;
        Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    fn mtime(&self, relative: &Path) -> Result<Option<i64>, SyncError> {
        let path = self.remote_path(relative);
        let output = self.run(&format!(
            "stat -c %Y -- {} 2>/dev/null || true",
            shell_quote(&path)
        ))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = stdout.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| SyncError::InvalidMtime {
                path,
                value: value.to_string(),
            })
    }

    fn upload(&self, local: &Path, relative: &Path, mode: u32) -> Result<(), SyncError> {
        let modified = fs::metadata(local)
            .and_then(|metadata| metadata.modified())
            .map_err(io_error(local))?;
        let path = self.remote_path(relative);
        let parent = self
            .root
            .join(relative)
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        let script = format!(
            "mkdir -p -m {mode:o} -- {dir} && cat > {file} && chmod {mode:o} -- {file} && touch -m -d @{mtime} -- {file}",
            mode = mode,
            dir = shell_quote(&parent),
            file = shell_quote(&path),
            mtime = epoch_seconds(modified),
        );
        let input = File::open(local).map_err(io_error(local))?;
        let output = self
            .ssh(&script)
            .stdin(Stdio::from(input))
            .output()
            .map_err(|source| SyncError::Spawn {
                program: "ssh",
                source,
            })?;
        check_output(output)?;
        debug!(local = %local.display(), remote = %path, "uploaded");
        Ok(())
    }

    fn download(&self, relative: &Path, local: &Path, mode: u32) -> Result<(), SyncError> {
        let path = shell_quote(&self.remote_path(relative));
        let output = self.run(&format!("stat -c %Y -- {path} && cat -- {path}"))?;
        let (mtime, contents) = split_first_line(&output.stdout);
        let mtime: i64 = mtime.trim().parse().map_err(|_| SyncError::InvalidMtime {
            path: self.remote_path(relative),
            value: mtime.trim().to_string(),
        })?;

        if let Some(parent) = local.parent() {
            create_dirs(parent, mode)?;
        }
        let mut file = File::create(local).map_err(io_error(local))?;
        file.write_all(contents).map_err(io_error(local))?;
        file.set_modified(from_epoch_seconds(mtime))
            .map_err(io_error(local))?;
        drop(file);
        set_mode(local, mode)?;
        debug!(remote = %self.remote_path(relative), local = %local.display(), "downloaded");
        Ok(())
    }
}

fn check_output(output: Output) -> Result<Output, SyncError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(SyncError::Command {
            program: "ssh",
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// `ls -1Ap` output: one name per line, directories end with `/`.
fn parse_listing(stdout: &str) -> Vec<RemoteEntry> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.strip_suffix('/') {
            Some(name) => RemoteEntry {
                name: name.to_string(),
                is_dir: true,
            },
            None => RemoteEntry {
                name: line.to_string(),
                is_dir: false,
            },
        })
        .collect()
}

fn split_first_line(bytes: &[u8]) -> (String, &[u8]) {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(index) => (
            String::from_utf8_lossy(&bytes[..index]).into_owned(),
            &bytes[index + 1..],
        ),
        None => (String::from_utf8_lossy(bytes).into_owned(), &[]),
    }
}

/// Single-quotes a word for a POSIX shell.
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

pub(super) fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(err) => -(err.duration().as_secs() as i64),
    }
}

fn from_epoch_seconds(seconds: i64) -> SystemTime {
    if seconds >= 0 {
        UNIX_EPOCH + Duration::from_secs(seconds as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(seconds.unsigned_abs())
    }
}

fn create_dirs(directory: &Path, mode: u32) -> Result<(), SyncError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(directory).map_err(io_error(directory))
}

fn set_mode(path: &Path, mode: u32) -> Result<(), SyncError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(io_error(path))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Copies a file, then gives it the source modification time and `mode`.
fn copy_file(from: &Path, to: &Path, mode: u32) -> Result<(), SyncError> {
    let modified = fs::metadata(from)
        .and_then(|metadata| metadata.modified())
        .map_err(io_error(from))?;
    if let Some(parent) = to.parent() {
        create_dirs(parent, mode)?;
    }
    fs::copy(from, to).map_err(io_error(to))?;
    File::options()
        .write(true)
        .open(to)
        .and_then(|file| file.set_modified(modified))
        .map_err(io_error(to))?;
    set_mode(to, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_remote() {
        let remote: ScpRemote = "tsutterley@example.org:/data/references".parse().unwrap();
        assert_eq!(
            remote.display(Path::new("2008/Rignot/Rignot-2008ct.bib")),
            "tsutterley@example.org:/data/references/2008/Rignot/Rignot-2008ct.bib"
        );
        assert!(matches!(
            "references".parse::<ScpRemote>(),
            Err(SyncError::InvalidRemote(_))
        ));
        assert!(matches!(
            "host:".parse::<ScpRemote>(),
            Err(SyncError::InvalidRemote(_))
        ));
    }

    #[test]
    fn test_commands_share_one_connection() {
        let remote: ScpRemote = "example.org:/data/references".parse().unwrap();
        let remote = remote.with_identity(Some(PathBuf::from("/home/me/.ssh/id")));
        let control = format!("ControlPath={}", remote.control.path().join("%C").display());

        for script in ["ls -1Ap -- /data", "stat -c %Y -- /data/a.bib"] {
            let command = remote.ssh(script);
            let args: Vec<String> = command
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            assert_eq!(
                args,
                vec![
                    "-o",
                    "ConnectTimeout=20",
                    "-o",
                    "ControlMaster=auto",
                    "-o",
                    control.as_str(),
                    "-o",
                    "ControlPersist=60",
                    "-i",
                    "/home/me/.ssh/id",
                    "example.org",
                    script,
                ]
            );
        }
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/data/O'Neil"), r"'/data/O'\''Neil'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }

    #[test]
    fn test_parse_listing() {
        assert_eq!(
            parse_listing("Rignot-2008ct.bib\nSupplemental/\n\n"),
            vec![
                RemoteEntry {
                    name: "Rignot-2008ct.bib".to_string(),
                    is_dir: false
                },
                RemoteEntry {
                    name: "Supplemental".to_string(),
                    is_dir: true
                },
            ]
        );
    }

    #[test]
    fn test_split_first_line() {
        let (mtime, contents) = split_first_line(b"1200000000\n%PDF\nbody");
        assert_eq!(mtime, "1200000000");
        assert_eq!(contents, b"%PDF\nbody");
    }

    #[test]
    fn test_copy_keeps_mtime() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.bib");
        fs::write(&source, "@article{}").unwrap();
        let mtime = from_epoch_seconds(1_200_000_000);
        File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let remote = DirectoryRemote::new(dir.path().join("mirror"));
        let relative = Path::new("2008/Rignot/a.bib");
        assert_eq!(remote.mtime(relative).unwrap(), None);
        remote.upload(&source, relative, 0o775).unwrap();
        assert_eq!(remote.mtime(relative).unwrap(), Some(1_200_000_000));
        assert_eq!(fs::read_to_string(remote.path(relative)).unwrap(), "@article{}");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(remote.path(relative)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o775);
        }
    }
}
