use super::{entry_name, remote_path, FileSession};
use crate::connection::ConnectionParams;
use crate::error::{Error, ParseError, Result};
use crate::file::{parse_timestamp, File, FileInfo};
use crate::permissions;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, warn};

/// A command the server refused, a reply that could not be read, or a
/// broken control/data connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FtpReply {
    Rejected { code: u32, message: String },
    /// The server answered but the reply body did not parse.
    Malformed(String),
    Io(String),
}

impl FtpReply {
    /// 500/502/504: the server does not understand or implement the command.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Rejected { code: 500 | 502 | 504, .. })
    }

    /// 450/550: file unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Rejected { code: 450 | 550, .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    /// An attribute query that failed this way leaves the field unknown
    /// instead of failing the entry.
    fn is_tolerable(&self) -> bool {
        self.is_unsupported() || self.is_unavailable() || self.is_malformed()
    }
}

impl fmt::Display for FtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { code, message } => write!(f, "{code} {message}"),
            Self::Malformed(message) | Self::Io(message) => f.write_str(message),
        }
    }
}

impl From<FtpError> for FtpReply {
    fn from(e: FtpError) -> Self {
        let message = e.to_string();
        match e {
            FtpError::UnexpectedResponse(response) => Self::Rejected {
                code: response.status.code(),
                message,
            },
            FtpError::BadResponse => Self::Malformed(message),
            _ => Self::Io(message),
        }
    }
}

/// The FTP commands the adapter relies on, with paths always relative to
/// the login directory or absolute.
pub trait FtpCommands {
    fn mlsd(&mut self, dir: &str) -> Result<Vec<String>, FtpReply>;
    fn nlst(&mut self, dir: &str) -> Result<Vec<String>, FtpReply>;
    fn list(&mut self, path: &str) -> Result<Vec<String>, FtpReply>;
    fn size(&mut self, path: &str) -> Result<u64, FtpReply>;
    fn mdtm(&mut self, path: &str) -> Result<DateTime<Utc>, FtpReply>;
    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpReply>;
    fn store(&mut self, path: &str, data: &[u8]) -> Result<(), FtpReply>;
    fn noop(&mut self) -> Result<(), FtpReply>;
    fn quit(&mut self) -> Result<(), FtpReply>;
}

impl FtpCommands for FtpStream {
    fn mlsd(&mut self, dir: &str) -> Result<Vec<String>, FtpReply> {
        Ok(FtpStream::mlsd(self, Some(dir))?)
    }

    fn nlst(&mut self, dir: &str) -> Result<Vec<String>, FtpReply> {
        Ok(FtpStream::nlst(self, Some(dir))?)
    }

    fn list(&mut self, path: &str) -> Result<Vec<String>, FtpReply> {
        Ok(FtpStream::list(self, Some(path))?)
    }

    fn size(&mut self, path: &str) -> Result<u64, FtpReply> {
        Ok(FtpStream::size(self, path)? as u64)
    }

    fn mdtm(&mut self, path: &str) -> Result<DateTime<Utc>, FtpReply> {
        let naive = FtpStream::mdtm(self, path)?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpReply> {
        Ok(self.retr_as_buffer(path)?.into_inner())
    }

    fn store(&mut self, path: &str, data: &[u8]) -> Result<(), FtpReply> {
        self.put_file(path, &mut Cursor::new(data))?;
        Ok(())
    }

    fn noop(&mut self) -> Result<(), FtpReply> {
        Ok(FtpStream::noop(self)?)
    }

    fn quit(&mut self) -> Result<(), FtpReply> {
        Ok(FtpStream::quit(self)?)
    }
}

/// One line of a Unix-style `LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListEntry {
    permissions: String,
    owner: String,
    group: String,
    is_dir: bool,
    name: String,
}

pub struct FtpClient<C = FtpStream> {
    host: String,
    conn: C,
}

impl FtpClient<FtpStream> {
    /// Open a control connection, log in and switch to binary transfers.
    pub fn connect(params: &ConnectionParams) -> Result<Self> {
        let addr = format!("{}:{}", params.host, params.port);
        debug!(host = %params.host, port = params.port, "connecting via FTP");

        let mut ftp =
            FtpStream::connect(&addr).map_err(|e| Error::connection(&params.host, e))?;
        ftp.login(&params.username, &params.password).map_err(|e| {
            Error::connection(&params.host, format!("authentication rejected: {e}"))
        })?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| Error::connection(&params.host, e))?;

        debug!(host = %params.host, "FTP session established");
        Ok(Self::with_commands(params.host.clone(), ftp))
    }
}

impl<C: FtpCommands> FtpClient<C> {
    pub fn with_commands(host: impl Into<String>, conn: C) -> Self {
        Self {
            host: host.into(),
            conn,
        }
    }

    fn map_reply(&self, reply: FtpReply, path: &str) -> Error {
        match reply {
            reply if reply.is_unavailable() => Error::NotFound(path.to_string()),
            FtpReply::Malformed(message) => {
                ParseError::Entry(format!("{path}: {message}")).into()
            }
            FtpReply::Io(message) => Error::connection(&self.host, message),
            reply => Error::transfer(path, reply),
        }
    }

    /// One MLSD round trip; `None` when the server does not support it.
    fn list_mlsd(&mut self, dir: &str) -> Result<Option<Vec<FileInfo>>> {
        let lines = match self.conn.mlsd(dir) {
            Ok(lines) => lines,
            Err(reply) if reply.is_unsupported() => {
                debug!(dir, %reply, "MLSD not supported, falling back to NLST");
                return Ok(None);
            }
            Err(reply) => return Err(self.map_reply(reply, dir)),
        };

        let files = lines
            .iter()
            .filter_map(|line| match parse_mlsd_line(line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir, error = %e, "skipping unreadable MLSD entry");
                    None
                }
            })
            .collect();
        Ok(Some(files))
    }

    /// NLST for names, then one `inspect` per entry.
    fn list_by_name(&mut self, dir: &str) -> Result<Vec<FileInfo>> {
        let entries = self
            .conn
            .nlst(dir)
            .map_err(|reply| self.map_reply(reply, dir))?;

        let mut files = Vec::new();
        for entry in &entries {
            let name = entry_name(entry);
            if name.is_empty() || name == "." || name == ".." {
                continue;
            }
            match self.inspect(name, dir) {
                Ok(Some(file)) => files.push(file),
                Ok(None) => {}
                Err(Error::NotFound(path)) => {
                    debug!(path = %path, "entry vanished during listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(files)
    }

    /// `LIST` supplies permissions and ownership, `MDTM` and `SIZE` the rest.
    /// Rejected or unreadable `MDTM`/`SIZE` replies leave the field at its
    /// default.
    ///
    /// `LIST` on a file describes that one file; on a directory it lists the
    /// children instead. Anything but a single entry named `name` is
    /// therefore not a plain file, and yields `None`.
    fn inspect(&mut self, name: &str, dir: &str) -> Result<Option<FileInfo>> {
        let path = remote_path(dir, name);
        let lines = self
            .conn
            .list(&path)
            .map_err(|reply| self.map_reply(reply, &path))?;
        let entries: Vec<ListEntry> = lines
            .iter()
            .filter_map(|line| parse_list_line(line))
            .collect();
        let entry = match entries.as_slice() {
            [entry] if !entry.is_dir && entry_name(&entry.name) == name => entry.clone(),
            _ => {
                debug!(path = %path, entries = entries.len(), "not a plain file, skipping");
                return Ok(None);
            }
        };

        let modified = match self.conn.mdtm(&path) {
            Ok(modified) => modified,
            Err(reply) if reply.is_tolerable() => {
                warn!(path = %path, %reply, "MDTM rejected, modification time unknown");
                DateTime::<Utc>::default()
            }
            Err(reply) => return Err(self.map_reply(reply, &path)),
        };

        let mut file = FileInfo::new(name, modified)
            .with_owner(entry.owner)
            .with_group(entry.group);

        match self.conn.size(&path) {
            Ok(size) => file = file.with_size(size),
            Err(reply) if reply.is_tolerable() => {
                warn!(path = %path, %reply, "SIZE rejected, size unknown");
            }
            Err(reply) => return Err(self.map_reply(reply, &path)),
        }

        match permissions::parse(&entry.permissions) {
            Ok(mode) => file = file.with_permissions(mode),
            Err(e) => warn!(path = %path, error = %e, "permissions unreadable"),
        }

        Ok(Some(file))
    }
}

impl<C: FtpCommands> FileSession for FtpClient<C> {
    fn list(&mut self, dir: &str) -> Result<Vec<FileInfo>> {
        match self.list_mlsd(dir)? {
            Some(files) => Ok(files),
            None => self.list_by_name(dir),
        }
    }

    fn stat(&mut self, name: &str, dir: &str) -> Result<FileInfo> {
        self.inspect(name, dir)?
            .ok_or_else(|| Error::NotFound(remote_path(dir, name)))
    }

    fn fetch(&mut self, file: &FileInfo, dir: &str) -> Result<File> {
        let path = remote_path(dir, file.name());
        let content = self
            .conn
            .retrieve(&path)
            .map_err(|reply| Error::transfer(&path, reply))?;
        Ok(File::new(file.clone(), content))
    }

    fn store(&mut self, file: &File, dir: &str) -> Result<FileInfo> {
        let path = remote_path(dir, file.name());
        self.conn
            .store(&path, file.content())
            .map_err(|reply| Error::transfer(&path, reply))?;
        self.stat(file.name(), dir)
    }

    fn is_active(&mut self) -> bool {
        self.conn.noop().is_ok()
    }

    fn close(&mut self) -> Result<()> {
        self.conn
            .quit()
            .map_err(|reply| Error::connection(&self.host, reply))
    }
}

/// Parse one MLSD line (`fact=value;fact=value; name`). Returns `Ok(None)`
/// for directory entries. Unreadable facts are defaulted, not fatal.
fn parse_mlsd_line(line: &str) -> Result<Option<FileInfo>, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (facts, name) = line
        .split_once(' ')
        .filter(|(_, name)| !name.is_empty())
        .ok_or_else(|| ParseError::Entry(line.to_string()))?;

    let facts: HashMap<String, &str> = facts
        .split(';')
        .filter_map(|fact| fact.split_once('='))
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect();

    if let Some(kind) = facts.get("type") {
        if matches!(kind.to_ascii_lowercase().as_str(), "dir" | "cdir" | "pdir") {
            return Ok(None);
        }
    }

    let modified = match facts.get("modify").map(|raw| parse_timestamp(raw)) {
        Some(Ok(modified)) => modified,
        Some(Err(e)) => {
            warn!(file = name, error = %e, "modify fact unreadable");
            DateTime::<Utc>::default()
        }
        None => DateTime::<Utc>::default(),
    };
    let mut file = FileInfo::new(name, modified);

    if let Some(raw) = facts.get("size") {
        match raw.parse::<u64>() {
            Ok(size) => file = file.with_size(size),
            Err(_) => warn!(file = name, size = %raw, "size fact unreadable"),
        }
    }

    if let Some(raw) = facts.get("unix.mode") {
        match permissions::parse(raw) {
            Ok(mode) => file = file.with_permissions(mode),
            Err(e) => warn!(file = name, error = %e, "unix.mode fact unreadable"),
        }
    }

    let owner = ["unix.owner", "unix.ownername", "unix.uid"]
        .iter()
        .find_map(|key| facts.get(*key));
    if let Some(owner) = owner {
        file = file.with_owner(*owner);
    }
    let group = ["unix.group", "unix.groupname", "unix.gid"]
        .iter()
        .find_map(|key| facts.get(*key));
    if let Some(group) = group {
        file = file.with_group(*group);
    }

    Ok(Some(file))
}

fn parse_list_line(line: &str) -> Option<ListEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }

    let mut name = parts[8..].join(" ");
    if parts[0].starts_with('l') {
        if let Some((link, _target)) = name.split_once(" -> ") {
            name = link.to_string();
        }
    }

    Some(ListEntry {
        permissions: parts[0].to_string(),
        owner: parts[2].to_string(),
        group: parts[3].to_string(),
        is_dir: parts[0].starts_with('d'),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Commands {}

        impl FtpCommands for Commands {
            fn mlsd(&mut self, dir: &str) -> Result<Vec<String>, FtpReply>;
            fn nlst(&mut self, dir: &str) -> Result<Vec<String>, FtpReply>;
            fn list(&mut self, path: &str) -> Result<Vec<String>, FtpReply>;
            fn size(&mut self, path: &str) -> Result<u64, FtpReply>;
            fn mdtm(&mut self, path: &str) -> Result<DateTime<Utc>, FtpReply>;
            fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, FtpReply>;
            fn store(&mut self, path: &str, data: &[u8]) -> Result<(), FtpReply>;
            fn noop(&mut self) -> Result<(), FtpReply>;
            fn quit(&mut self) -> Result<(), FtpReply>;
        }
    }

    fn rejected(code: u32) -> FtpReply {
        FtpReply::Rejected {
            code,
            message: "rejected".to_string(),
        }
    }

    fn mtime() -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_070_800, 0).unwrap()
    }

    #[test]
    fn test_parse_list_line_directory() {
        let line = "drwxr-xr-x 2 user group 4096 Nov 15 10:30 Documents";
        let entry = parse_list_line(line).unwrap();

        assert_eq!(entry.name, "Documents");
        assert!(entry.is_dir);
        assert_eq!(entry.permissions, "drwxr-xr-x");
    }

    #[test]
    fn test_parse_list_line_file_with_spaces() {
        let line = "-rw-r--r-- 1 vendor staff 1024 Nov 15 10:30 my file name.mrc";
        let entry = parse_list_line(line).unwrap();

        assert_eq!(entry.name, "my file name.mrc");
        assert!(!entry.is_dir);
        assert_eq!(entry.owner, "vendor");
        assert_eq!(entry.group, "staff");
    }

    #[test]
    fn test_parse_list_line_invalid() {
        assert!(parse_list_line("total 12").is_none());
        assert!(parse_list_line("invalid line").is_none());
    }

    #[test]
    fn test_parse_mlsd_line_file() {
        let line = "type=file;size=1024;modify=20240101010000;UNIX.mode=0644;UNIX.owner=vendor;UNIX.group=staff; foo.mrc";
        let file = parse_mlsd_line(line).unwrap().unwrap();

        assert_eq!(file.name(), "foo.mrc");
        assert_eq!(file.size(), Some(1024));
        assert_eq!(file.modified(), mtime());
        assert_eq!(file.permissions(), 0o644);
        assert_eq!(file.owner(), Some("vendor"));
        assert_eq!(file.group(), Some("staff"));
    }

    #[test]
    fn test_parse_mlsd_line_skips_directories() {
        for line in [
            "type=dir;modify=20240101010000; archive",
            "type=cdir;modify=20240101010000; .",
            "type=pdir;modify=20240101010000; ..",
        ] {
            assert_eq!(parse_mlsd_line(line), Ok(None), "{line}");
        }
    }

    #[test]
    fn test_parse_mlsd_line_defaults_bad_facts() {
        let line = "type=file;size=big;modify=yesterday;UNIX.mode=rwx; bad facts.mrc";
        let file = parse_mlsd_line(line).unwrap().unwrap();

        assert_eq!(file.name(), "bad facts.mrc");
        assert_eq!(file.size(), None);
        assert_eq!(file.modified().timestamp(), 0);
        assert_eq!(file.permissions(), 0);
        assert_eq!(file.owner(), None);
    }

    #[test]
    fn test_parse_mlsd_line_without_name() {
        assert!(matches!(
            parse_mlsd_line("type=file;size=1;"),
            Err(ParseError::Entry(_))
        ));
    }

    #[test]
    fn test_parse_list_line_symlink() {
        let line = "lrwxrwxrwx 1 user group 12 Nov 15 10:30 latest.mrc -> 2024/foo.mrc";
        let entry = parse_list_line(line).unwrap();

        assert_eq!(entry.name, "latest.mrc");
        assert!(!entry.is_dir);
    }

    #[test]
    fn test_reply_classification() {
        assert!(rejected(502).is_unsupported());
        assert!(rejected(500).is_unsupported());
        assert!(!rejected(550).is_unsupported());
        assert!(rejected(550).is_unavailable());
        assert!(!FtpReply::Io("reset".to_string()).is_unavailable());
    }

    #[test]
    fn test_list_uses_mlsd() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd().with(eq("/out")).times(1).returning(|_| {
            Ok(vec![
                "type=cdir;modify=20240101010000; .".to_string(),
                "type=file;size=1;modify=20240101010000;UNIX.mode=0644; foo.mrc".to_string(),
                "garbage".to_string(),
            ])
        });
        conn.expect_nlst().never();

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let files = client.list("/out").unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "foo.mrc");
        assert_eq!(files[0].permissions(), 0o644);
    }

    #[test]
    fn test_list_falls_back_when_mlsd_unsupported() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd().times(1).returning(|_| Err(rejected(502)));
        conn.expect_nlst()
            .with(eq("/out"))
            .times(1)
            .returning(|_| Ok(vec!["/out/foo.mrc".to_string(), "/out/bar.zip".to_string()]));
        conn.expect_list().returning(|path| {
            let name = path.rsplit('/').next().unwrap().to_string();
            Ok(vec![format!("-rw-r--r-- 1 vendor staff 1 Jan 01 01:00 {name}")])
        });
        conn.expect_mdtm().returning(|_| Ok(mtime()));
        conn.expect_size()
            .with(eq("/out/foo.mrc"))
            .returning(|_| Ok(1));
        conn.expect_size()
            .with(eq("/out/bar.zip"))
            .returning(|_| Err(rejected(550)));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let files = client.list("/out").unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name(), "foo.mrc");
        assert_eq!(files[0].size(), Some(1));
        assert_eq!(files[1].name(), "bar.zip");
        assert_eq!(files[1].size(), None);
        assert!(files.iter().all(|f| f.modified() == mtime()));
        assert!(files.iter().all(|f| f.permissions() == 0o644));
    }

    fn directory_listing(path: &str) -> std::result::Result<Vec<String>, FtpReply> {
        Ok(match path {
            "/out/foo.mrc" => vec!["-rw-r--r-- 1 vendor staff 1 Jan 01 01:00 foo.mrc".to_string()],
            "/out/archive" => vec![
                "total 8".to_string(),
                "-rw-r--r-- 1 vendor staff 1 Jan 01 01:00 old.mrc".to_string(),
            ],
            "/out/single" => vec!["-rw-r--r-- 1 vendor staff 1 Jan 01 01:00 other.mrc".to_string()],
            "/out/self" => vec!["drwxr-xr-x 2 vendor staff 4096 Jan 01 01:00 self".to_string()],
            _ => vec![],
        })
    }

    #[test]
    fn test_fallback_skips_directories() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd().returning(|_| Err(rejected(500)));
        conn.expect_nlst().returning(|_| {
            Ok(["foo.mrc", "archive", "single", "self", "empty"]
                .iter()
                .map(|name| (*name).to_string())
                .collect())
        });
        conn.expect_list().returning(directory_listing);
        conn.expect_mdtm()
            .with(eq("/out/foo.mrc"))
            .times(1)
            .returning(|_| Ok(mtime()));
        conn.expect_size()
            .with(eq("/out/foo.mrc"))
            .times(1)
            .returning(|_| Ok(1));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let files = client.list("/out").unwrap();

        let names: Vec<&str> = files.iter().map(FileInfo::name).collect();
        assert_eq!(names, vec!["foo.mrc"]);
    }

    #[test]
    fn test_stat_directory_is_not_found() {
        let mut conn = MockCommands::new();
        conn.expect_list().returning(directory_listing);
        conn.expect_mdtm().never();
        conn.expect_size().never();

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        for name in ["archive", "single", "self", "empty"] {
            let err = client.stat(name, "/out").unwrap_err();
            assert!(err.is_not_found(), "{name}: {err}");
        }
    }

    #[test]
    fn test_malformed_attribute_replies_default_fields() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd().returning(|_| Err(rejected(502)));
        conn.expect_nlst().returning(|_| Ok(vec!["foo.mrc".to_string()]));
        conn.expect_list().returning(directory_listing);
        conn.expect_mdtm()
            .returning(|_| Err(FtpReply::from(FtpError::BadResponse)));
        conn.expect_size()
            .returning(|_| Err(FtpReply::Malformed("invalid syntax".to_string())));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let files = client.list("/out").unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "foo.mrc");
        assert_eq!(files[0].size(), None);
        assert_eq!(files[0].modified(), DateTime::<Utc>::default());
        assert_eq!(files[0].permissions(), 0o644);
    }

    #[test]
    fn test_malformed_reply_is_parse_error() {
        let reply = FtpReply::from(FtpError::BadResponse);
        assert!(reply.is_malformed());

        let client = FtpClient::with_commands("ftp.example.com", MockCommands::new());
        let err = client.map_reply(reply, "/out/foo.mrc");
        assert!(matches!(err, Error::Parse(ParseError::Entry(_))));
    }

    #[test]
    fn test_list_missing_directory() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd().returning(|_| Err(rejected(550)));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let err = client.list("/missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(path) if path == "/missing"));
    }

    #[test]
    fn test_list_connection_lost() {
        let mut conn = MockCommands::new();
        conn.expect_mlsd()
            .returning(|_| Err(FtpReply::Io("connection reset".to_string())));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        assert!(matches!(
            client.list("/out").unwrap_err(),
            Error::Connection { .. }
        ));
    }

    #[test]
    fn test_stat_missing_file() {
        let mut conn = MockCommands::new();
        conn.expect_list().returning(|_| Ok(vec![]));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let err = client.stat("missing.mrc", "/out").unwrap_err();
        assert!(matches!(err, Error::NotFound(path) if path == "/out/missing.mrc"));
    }

    #[test]
    fn test_fetch_failure_is_transfer_error() {
        let mut conn = MockCommands::new();
        conn.expect_retrieve().returning(|_| Err(rejected(550)));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let err = client
            .fetch(&FileInfo::new("foo.mrc", mtime()), "/out")
            .unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
    }

    #[test]
    fn test_store_then_stat() {
        let mut conn = MockCommands::new();
        conn.expect_store()
            .withf(|path, data| path == "/in/foo.mrc" && data == &b"record"[..])
            .times(1)
            .returning(|_, _| Ok(()));
        conn.expect_list()
            .returning(|_| Ok(vec!["-rw-r----- 1 drop drop 6 Jan 01 01:00 foo.mrc".to_string()]));
        conn.expect_mdtm().returning(|_| Ok(mtime()));
        conn.expect_size().returning(|_| Ok(6));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        let file = File::new(FileInfo::new("foo.mrc", mtime()), b"record".to_vec());
        let written = client.store(&file, "/in").unwrap();

        assert_eq!(written.size(), Some(6));
        assert_eq!(written.permissions(), 0o640);
        assert_eq!(written.owner(), Some("drop"));
    }

    #[test]
    fn test_is_active_and_close() {
        let mut conn = MockCommands::new();
        conn.expect_noop().times(1).returning(|| Ok(()));
        conn.expect_quit().times(1).returning(|| Ok(()));

        let mut client = FtpClient::with_commands("ftp.example.com", conn);
        assert!(client.is_active());
        assert!(client.close().is_ok());
    }
}
