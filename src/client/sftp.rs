use super::{remote_path, FileSession};
use crate::connection::ConnectionParams;
use crate::error::{Error, Result};
use crate::file::{File, FileInfo};
use chrono::{DateTime, TimeZone, Utc};
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::debug;

// SFTP status codes (draft-ietf-secsh-filexfer-02, section 7)
const SSH_FX_NO_SUCH_FILE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpFailure {
    /// `SSH_FX_NO_SUCH_FILE`.
    Missing(String),
    /// Any other SFTP status.
    Rejected(String),
    /// The SSH session itself failed.
    Session(String),
}

impl fmt::Display for SftpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(message) | Self::Rejected(message) | Self::Session(message) => {
                f.write_str(message)
            }
        }
    }
}

impl From<ssh2::Error> for SftpFailure {
    fn from(e: ssh2::Error) -> Self {
        let message = e.message().to_string();
        match e.code() {
            ErrorCode::SFTP(SSH_FX_NO_SUCH_FILE) => Self::Missing(message),
            ErrorCode::SFTP(_) => Self::Rejected(message),
            ErrorCode::Session(_) => Self::Session(message),
        }
    }
}

impl From<std::io::Error> for SftpFailure {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::Missing(e.to_string()),
            _ => Self::Session(e.to_string()),
        }
    }
}

/// The SFTP requests the adapter relies on.
pub trait SftpCommands {
    fn read_dir(&mut self, dir: &Path) -> Result<Vec<(PathBuf, FileStat)>, SftpFailure>;
    fn stat(&mut self, path: &Path) -> Result<FileStat, SftpFailure>;
    fn read(&mut self, path: &Path) -> Result<Vec<u8>, SftpFailure>;
    fn write(&mut self, path: &Path, data: &[u8]) -> Result<(), SftpFailure>;
    fn realpath(&mut self, path: &Path) -> Result<PathBuf, SftpFailure>;
    fn close(&mut self) -> Result<(), SftpFailure>;
}

/// An authenticated SSH session with its SFTP channel.
pub struct SshSftp {
    session: Session,
    sftp: Sftp,
}

impl SftpCommands for SshSftp {
    fn read_dir(&mut self, dir: &Path) -> Result<Vec<(PathBuf, FileStat)>, SftpFailure> {
        Ok(self.sftp.readdir(dir)?)
    }

    fn stat(&mut self, path: &Path) -> Result<FileStat, SftpFailure> {
        Ok(self.sftp.stat(path)?)
    }

    fn read(&mut self, path: &Path) -> Result<Vec<u8>, SftpFailure> {
        let mut file = self.sftp.open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> Result<(), SftpFailure> {
        let mut file = self.sftp.create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn realpath(&mut self, path: &Path) -> Result<PathBuf, SftpFailure> {
        Ok(self.sftp.realpath(path)?)
    }

    fn close(&mut self) -> Result<(), SftpFailure> {
        Ok(self.session.disconnect(None, "closing session", None)?)
    }
}

pub struct SftpClient<C = SshSftp> {
    host: String,
    conn: C,
}

impl SftpClient<SshSftp> {
    /// TCP connect, SSH handshake, password authentication, then open the
    /// SFTP subsystem.
    pub fn connect(params: &ConnectionParams) -> Result<Self> {
        let host = params.host.as_str();
        debug!(host, port = params.port, "connecting via SFTP");

        let tcp = TcpStream::connect((host, params.port))
            .map_err(|e| Error::connection(host, format!("TCP connect failed: {e}")))?;
        let mut session = Session::new()
            .map_err(|e| Error::connection(host, format!("SSH session setup failed: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| Error::connection(host, format!("SSH handshake failed: {e}")))?;
        session
            .userauth_password(&params.username, &params.password)
            .map_err(|e| Error::connection(host, format!("authentication rejected: {e}")))?;
        if !session.authenticated() {
            return Err(Error::connection(host, "authentication rejected"));
        }
        let sftp = session
            .sftp()
            .map_err(|e| Error::connection(host, format!("SFTP subsystem unavailable: {e}")))?;

        debug!(host, "SFTP session established");
        Ok(Self::with_commands(host, SshSftp { session, sftp }))
    }
}

impl<C: SftpCommands> SftpClient<C> {
    pub fn with_commands(host: impl Into<String>, conn: C) -> Self {
        Self {
            host: host.into(),
            conn,
        }
    }

    fn map_failure(&self, failure: SftpFailure, path: &str) -> Error {
        match failure {
            SftpFailure::Missing(_) => Error::NotFound(path.to_string()),
            SftpFailure::Rejected(message) => Error::transfer(path, message),
            SftpFailure::Session(message) => Error::connection(&self.host, message),
        }
    }
}

impl<C: SftpCommands> FileSession for SftpClient<C> {
    fn list(&mut self, dir: &str) -> Result<Vec<FileInfo>> {
        let entries = self
            .conn
            .read_dir(Path::new(dir))
            .map_err(|failure| self.map_failure(failure, dir))?;

        Ok(entries
            .iter()
            .filter(|(_, stat)| !stat.is_dir())
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_string_lossy();
                (name != "." && name != "..").then(|| file_info(&name, stat))
            })
            .collect())
    }

    fn stat(&mut self, name: &str, dir: &str) -> Result<FileInfo> {
        let path = remote_path(dir, name);
        let stat = self
            .conn
            .stat(Path::new(&path))
            .map_err(|failure| self.map_failure(failure, &path))?;
        if stat.is_dir() {
            return Err(Error::NotFound(path));
        }
        Ok(file_info(name, &stat))
    }

    fn fetch(&mut self, file: &FileInfo, dir: &str) -> Result<File> {
        let path = remote_path(dir, file.name());
        let content = self
            .conn
            .read(Path::new(&path))
            .map_err(|failure| Error::transfer(&path, failure))?;
        Ok(File::new(file.clone(), content))
    }

    fn store(&mut self, file: &File, dir: &str) -> Result<FileInfo> {
        let path = remote_path(dir, file.name());
        self.conn
            .write(Path::new(&path), file.content())
            .map_err(|failure| Error::transfer(&path, failure))?;
        self.stat(file.name(), dir)
    }

    fn is_active(&mut self) -> bool {
        self.conn.realpath(Path::new(".")).is_ok()
    }

    fn close(&mut self) -> Result<()> {
        self.conn
            .close()
            .map_err(|failure| Error::connection(&self.host, failure))
    }
}

/// Stat attributes arrive already numeric; only the permission bits of
/// `perm` are kept.
fn file_info(name: &str, stat: &FileStat) -> FileInfo {
    let modified = stat.mtime.and_then(timestamp).unwrap_or_default();
    let mut info = FileInfo::new(name, modified);
    if let Some(size) = stat.size {
        info = info.with_size(size);
    }
    if let Some(perm) = stat.perm {
        info = info.with_permissions(perm);
    }
    if let Some(uid) = stat.uid {
        info = info.with_owner(uid.to_string());
    }
    if let Some(gid) = stat.gid {
        info = info.with_group(gid.to_string());
    }
    if let Some(accessed) = stat.atime.and_then(timestamp) {
        info = info.with_accessed(accessed);
    }
    info
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(i64::try_from(secs).ok()?, 0).single()
}
