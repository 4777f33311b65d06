use crate::client::ftp::FtpClient;
use crate::client::sftp::SftpClient;
use crate::client::{self, FileSession};
use crate::error::{Error, Result};
use crate::file::{File, FileInfo};
use crate::window::{filter_since, Since};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ftp,
    Sftp,
}

impl Protocol {
    /// 21 selects FTP and 22 selects SFTP; other ports need an explicit
    /// protocol.
    pub fn from_port(port: u16) -> Option<Self> {
        match port {
            21 => Some(Self::Ftp),
            22 => Some(Self::Sftp),
            _ => None,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Ftp => 21,
            Self::Sftp => 22,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ftp => f.write_str("FTP"),
            Self::Sftp => f.write_str("SFTP"),
        }
    }
}

/// Everything needed to open one session with a vendor's server.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Vendor identifier, used in log lines.
    pub name: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Result of [`Client::put_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Written(FileInfo),
    /// A same-named file was already in the destination; nothing was
    /// transferred. Carries the existing file's metadata.
    AlreadyExists(FileInfo),
}

/// One open session with a vendor's server, whichever protocol it speaks.
///
/// The session is closed exactly once: by [`Client::close`], by
/// [`Client::within`] when its closure returns, or on drop.
pub struct Client {
    name: String,
    session: Box<dyn FileSession>,
    closed: bool,
}

impl Client {
    /// Open a session using the adapter matching `params.protocol`.
    pub fn connect(params: &ConnectionParams) -> Result<Self> {
        info!(
            vendor = %params.name,
            host = %params.host,
            protocol = %params.protocol,
            "connecting"
        );
        let session = match params.protocol {
            Protocol::Ftp => {
                FtpClient::connect(params).map(|c| Box::new(c) as Box<dyn FileSession>)
            }
            Protocol::Sftp => {
                SftpClient::connect(params).map(|c| Box::new(c) as Box<dyn FileSession>)
            }
        }
        .map_err(|e| {
            error!(vendor = %params.name, error = %e, "unable to connect");
            e
        })?;
        info!(vendor = %params.name, "connected to server");
        Ok(Self::with_session(params.name.clone(), session))
    }

    /// Wrap an already open session.
    pub fn with_session(name: impl Into<String>, session: Box<dyn FileSession>) -> Self {
        Self {
            name: name.into(),
            session,
            closed: false,
        }
    }

    /// Connect, run `f`, then close, whether `f` succeeded or not.
    pub fn scoped<T>(
        params: &ConnectionParams,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        Self::connect(params)?.within(f)
    }

    /// Run `f` against this client and close it afterwards.
    pub fn within<T>(mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(&mut self);
        if let Err(e) = self.close() {
            warn!(error = %e, "session did not close cleanly");
        }
        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check_connection(&mut self) -> bool {
        self.session.is_active()
    }

    pub fn get_file_info(&mut self, file_name: &str, remote_dir: &str) -> Result<FileInfo> {
        debug!(vendor = %self.name, file_name, remote_dir, "retrieving file info");
        self.session.stat(file_name, remote_dir).map_err(|e| {
            error!(vendor = %self.name, error = %e, "unable to retrieve file info for {file_name}");
            e
        })
    }

    /// Every file in `remote_dir`, or only those modified between `since`
    /// and now. `since` is a lookback or a fixed instant; both
    /// `Lookback` and `DateTime<Utc>` convert into it.
    pub fn list_file_data(
        &mut self,
        remote_dir: &str,
        since: Option<Since>,
    ) -> Result<Vec<FileInfo>> {
        debug!(vendor = %self.name, remote_dir, "retrieving list of files");
        let files = self.session.list(remote_dir).map_err(|e| {
            error!(vendor = %self.name, error = %e, "unable to list `{remote_dir}`");
            e
        })?;

        let Some(since) = since else {
            debug!(vendor = %self.name, "{} file(s) in `{remote_dir}`", files.len());
            return Ok(files);
        };

        let now = Utc::now();
        debug!(
            vendor = %self.name,
            "filtering for files modified since {}",
            since.start(now).format("%Y-%m-%d %H:%M:%S")
        );
        let recent = filter_since(now, since, files);
        debug!(vendor = %self.name, "{} recent file(s) in `{remote_dir}`", recent.len());
        Ok(recent)
    }

    pub fn get_file(&mut self, file: &FileInfo, remote_dir: &str) -> Result<File> {
        debug!(vendor = %self.name, "fetching {} from `{remote_dir}`", file.name());
        self.session.fetch(file, remote_dir).map_err(|e| {
            error!(vendor = %self.name, error = %e, "unable to fetch {}", file.name());
            e
        })
    }

    /// Whether `file` is already in `dir`. On the server (`remote`) a
    /// same-named file only counts when its size matches too, so a partial
    /// upload is sent again. Locally the name is enough.
    pub fn file_exists(&mut self, file: &FileInfo, dir: &str, remote: bool) -> Result<bool> {
        Ok(self.existing(file.name(), file.size(), dir, remote)?.is_some())
    }

    fn existing(
        &mut self,
        name: &str,
        size: Option<u64>,
        dir: &str,
        remote: bool,
    ) -> Result<Option<FileInfo>> {
        let found = if remote {
            self.session.stat(name, dir)
        } else {
            client::stat_local(name, Path::new(dir))
        };
        match found {
            Ok(info) if remote && sizes_differ(info.size(), size) => {
                warn!(
                    vendor = %self.name,
                    "{name} in `{dir}` is {:?} bytes, expected {:?}; treating as absent",
                    info.size(),
                    size
                );
                Ok(None)
            }
            Ok(info) => Ok(Some(info)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `file` to `dir` on the server (`remote`) or locally. With
    /// `check`, an existing same-named file is reported instead of being
    /// overwritten.
    pub fn put_file(
        &mut self,
        file: &File,
        dir: &str,
        remote: bool,
        check: bool,
    ) -> Result<PutOutcome> {
        if check {
            debug!(vendor = %self.name, "checking for {} in `{dir}` before writing", file.name());
            let size = u64::try_from(file.content().len()).ok();
            if let Some(existing) = self.existing(file.name(), size, dir, remote)? {
                debug!(vendor = %self.name, "skipping {}, already exists in `{dir}`", file.name());
                return Ok(PutOutcome::AlreadyExists(existing));
            }
        }

        debug!(vendor = %self.name, "writing {} to `{dir}`", file.name());
        client::place(self.session.as_mut(), file, dir, remote)
            .map(PutOutcome::Written)
            .map_err(|e| {
                error!(vendor = %self.name, error = %e, "unable to write {}", file.name());
                e
            })
    }

    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!(vendor = %self.name, "closing client session");
        self.session.close()?;
        info!(vendor = %self.name, "connection closed");
        Ok(())
    }
}

/// Only known sizes are compared.
fn sizes_differ(found: Option<u64>, expected: Option<u64>) -> bool {
    matches!((found, expected), (Some(found), Some(expected)) if found != expected)
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(vendor = %self.name, error = %e, "session did not close cleanly");
        }
    }
}
