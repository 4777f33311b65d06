pub mod ftp;
pub mod sftp;

use crate::error::{Error, Result};
use crate::file::{File, FileInfo};
use std::fs;
use std::io;
use std::path::Path;

/// Capability set every protocol adapter provides.
///
/// Opening a session is each adapter's own `connect` constructor; everything
/// after that goes through this trait so the [`crate::connection::Client`]
/// never needs to know which protocol it is talking to. Errors returned
/// here are already translated into [`Error`].
pub trait FileSession {
    /// Metadata for every regular file in `dir`. Directories are skipped.
    fn list(&mut self, dir: &str) -> Result<Vec<FileInfo>>;

    /// Metadata for a single file, or [`Error::NotFound`].
    fn stat(&mut self, name: &str, dir: &str) -> Result<FileInfo>;

    fn fetch(&mut self, file: &FileInfo, dir: &str) -> Result<File>;

    /// Upload `file` into `dir` on the server, returning what the server
    /// reports for it afterwards.
    fn store(&mut self, file: &File, dir: &str) -> Result<FileInfo>;

    fn is_active(&mut self) -> bool;

    fn close(&mut self) -> Result<()>;
}

/// Write `file` into `dir`, either on the server behind `session` or on
/// the local filesystem. The same primitive serves uploads and local
/// downloads; only the destination changes.
pub fn place(
    session: &mut dyn FileSession,
    file: &File,
    dir: &str,
    remote: bool,
) -> Result<FileInfo> {
    if remote {
        session.store(file, dir)
    } else {
        write_local(file, Path::new(dir))
    }
}

/// The local directory must already exist.
pub fn write_local(file: &File, dir: &Path) -> Result<FileInfo> {
    let path = dir.join(file.name());
    fs::write(&path, file.content()).map_err(|e| Error::transfer(file.name(), e))?;
    let metadata = fs::metadata(&path).map_err(|e| Error::transfer(file.name(), e))?;
    Ok(FileInfo::from_local_metadata(file.name(), &metadata))
}

pub fn stat_local(name: &str, dir: &Path) -> Result<FileInfo> {
    let path = dir.join(name);
    match fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => Ok(FileInfo::from_local_metadata(name, &metadata)),
        Ok(_) => Err(Error::NotFound(path.display().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::NotFound(path.display().to_string()))
        }
        Err(e) => Err(Error::transfer(name, e)),
    }
}

/// Join a remote directory and an entry name with `/`.
pub fn remote_path(dir: &str, name: &str) -> String {
    match dir.trim_end_matches('/') {
        "" if dir.starts_with('/') => format!("/{name}"),
        "" => name.to_string(),
        trimmed => format!("{trimmed}/{name}"),
    }
}

/// Last path component of a listing entry (NLST may return full paths).
pub(crate) fn entry_name(entry: &str) -> &str {
    entry
        .trim_end_matches(['\r', '\n'])
        .rsplit('/')
        .next()
        .unwrap_or(entry)
}
