use crate::error::{Error, ParseError, Result};
use crate::permissions;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Normalized metadata for one file, whichever protocol listed it.
///
/// Records are built fresh by every listing call and are not mutated
/// afterwards; the `with_*` methods only exist to finish construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    name: String,
    size: Option<u64>,
    modified: DateTime<Utc>,
    permissions: u32,
    owner: Option<String>,
    group: Option<String>,
    accessed: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified,
            permissions: 0,
            owner: None,
            group: None,
            accessed: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// `mode` may still carry file type bits; only the permission bits are kept.
    #[must_use]
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = permissions::from_mode(mode);
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_accessed(mut self, accessed: DateTime<Utc>) -> Self {
        self.accessed = Some(accessed);
        self
    }

    /// Build a record for a file on the local filesystem.
    pub fn from_local_metadata(name: impl Into<String>, metadata: &fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();
        let mut info = Self::new(name, modified).with_size(metadata.len());
        if let Ok(accessed) = metadata.accessed() {
            info = info.with_accessed(accessed.into());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            info = info
                .with_permissions(metadata.mode())
                .with_owner(metadata.uid().to_string())
                .with_group(metadata.gid().to_string());
        }

        info
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` when the server would not report a size for this entry.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Permission bits in the 0..=0o777 range.
    pub fn permissions(&self) -> u32 {
        self.permissions
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn accessed(&self) -> Option<DateTime<Utc>> {
        self.accessed
    }
}

/// A file's metadata together with its fetched bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    info: FileInfo,
    content: Vec<u8>,
}

impl File {
    pub fn new(info: FileInfo, content: Vec<u8>) -> Self {
        Self { info, content }
    }

    /// Read a local file so it can be placed on a server.
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::NotFound(display.clone()))?;
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(display.clone()),
            _ => Error::transfer(&name, e),
        })?;
        let content = fs::read(path).map_err(|e| Error::transfer(&name, e))?;
        Ok(Self::new(FileInfo::from_local_metadata(name, &metadata), content))
    }

    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_parts(self) -> (FileInfo, Vec<u8>) {
        (self.info, self.content)
    }
}

/// Parse an RFC 3659 time-val (`YYYYMMDDHHMMSS[.sss]`, always UTC), as used
/// by MLSD `modify` facts and MDTM replies.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, ParseError> {
    let raw = raw.trim();
    let whole = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ParseError::Timestamp(raw.to_string()))
}
