use crate::file::FileInfo;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How far back to look for recently modified files. Components add up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl Lookback {
    pub fn new(days: u32, hours: u32, minutes: u32) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    pub fn days(days: u32) -> Self {
        Self::new(days, 0, 0)
    }

    pub fn hours(hours: u32) -> Self {
        Self::new(0, hours, 0)
    }

    pub fn minutes(minutes: u32) -> Self {
        Self::new(0, 0, minutes)
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(
            i64::from(self.days) * 86_400
                + i64::from(self.hours) * 3_600
                + i64::from(self.minutes) * 60,
        )
    }

    /// Earliest modification time inside the window ending at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Keep the files modified within `[now - lookback, now]`, both ends
/// inclusive. A zero lookback keeps nothing.
pub fn filter_recent(
    now: DateTime<Utc>,
    lookback: Lookback,
    files: impl IntoIterator<Item = FileInfo>,
) -> Vec<FileInfo> {
    if lookback.is_zero() {
        return Vec::new();
    }
    let start = lookback.start(now);
    files
        .into_iter()
        .filter(|file| (start..=now).contains(&file.modified()))
        .collect()
}

/// Lower bound of a listing window: a lookback from now, or a fixed
/// instant. The window always ends at now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    Lookback(Lookback),
    After(DateTime<Utc>),
}

impl Since {
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Lookback(lookback) => lookback.start(now),
            Self::After(start) => *start,
        }
    }
}

impl From<Lookback> for Since {
    fn from(lookback: Lookback) -> Self {
        Self::Lookback(lookback)
    }
}

impl From<DateTime<Utc>> for Since {
    fn from(start: DateTime<Utc>) -> Self {
        Self::After(start)
    }
}

/// Keep the files modified within `[since, now]`. A zero lookback keeps
/// nothing, and so does a start later than `now`.
pub fn filter_since(
    now: DateTime<Utc>,
    since: Since,
    files: impl IntoIterator<Item = FileInfo>,
) -> Vec<FileInfo> {
    match since {
        Since::Lookback(lookback) => filter_recent(now, lookback, files),
        Since::After(start) => files
            .into_iter()
            .filter(|file| (start..=now).contains(&file.modified()))
            .collect(),
    }
}
