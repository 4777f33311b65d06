#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use file_retriever::client::ftp::{FtpCommands, FtpReply};
use file_retriever::client::sftp::{SftpCommands, SftpFailure};
use mockall::mock;
use ssh2::FileStat;
use std::path::{Path, PathBuf};

mock! {
    pub Ftp {}

    impl FtpCommands for Ftp {
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

mock! {
    pub Sftp {}

    impl SftpCommands for Sftp {
        fn read_dir(&mut self, dir: &Path) -> Result<Vec<(PathBuf, FileStat)>, SftpFailure>;
        fn stat(&mut self, path: &Path) -> Result<FileStat, SftpFailure>;
        fn read(&mut self, path: &Path) -> Result<Vec<u8>, SftpFailure>;
        fn write(&mut self, path: &Path, data: &[u8]) -> Result<(), SftpFailure>;
        fn realpath(&mut self, path: &Path) -> Result<PathBuf, SftpFailure>;
        fn close(&mut self) -> Result<(), SftpFailure>;
    }
}

pub const REGULAR_FILE: u32 = 0o100_000;
pub const DIRECTORY: u32 = 0o040_000;

/// 2024-01-01 01:00:00 UTC, in every representation the servers use.
pub const MTIME_SECS: u64 = 1_704_070_800;
pub const MTIME_FACT: &str = "20240101010000";

pub fn mtime() -> DateTime<Utc> {
    Utc.timestamp_opt(MTIME_SECS as i64, 0).unwrap()
}

pub fn file_stat(mode: u32, size: u64, mtime: u64) -> FileStat {
    FileStat {
        size: Some(size),
        uid: Some(1001),
        gid: Some(1001),
        perm: Some(mode),
        atime: Some(mtime),
        mtime: Some(mtime),
    }
}

pub fn rejected(code: u32) -> FtpReply {
    FtpReply::Rejected {
        code,
        message: "command rejected".to_string(),
    }
}

/// An FTP mock that expects exactly one QUIT.
pub fn quitting_ftp() -> MockFtp {
    let mut ftp = MockFtp::new();
    ftp.expect_quit().times(1).returning(|| Ok(()));
    ftp
}

/// An SFTP mock that expects exactly one close.
pub fn closing_sftp() -> MockSftp {
    let mut sftp = MockSftp::new();
    sftp.expect_close().times(1).returning(|| Ok(()));
    sftp
}
