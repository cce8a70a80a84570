//! Local persistence: one pretty-printed JSON file per collection, plus
//! timestamped backup directories and saved text reports.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::entry::{PerformanceEntry, SleepEntry};
use crate::error::{JournalError, Result};

pub const SLEEP_FILE: &str = "sleep_entries.json";
pub const PERFORMANCE_FILE: &str = "performance_entries.json";
pub const BACKUP_DIR: &str = "backup";
pub const REPORTS_DIR: &str = "reports";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Records that belong to a single calendar day.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for SleepEntry {
    fn date(&self) -> NaiveDate {
        SleepEntry::date(self)
    }
}

impl Dated for PerformanceEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    New,
    /// An entry for the same date existed and was replaced.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupId {
    pub id: String,
    pub path: PathBuf,
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// What the journal needs from storage. Loads return entries ordered by date;
/// an append is durable once it returns.
pub trait JournalStore {
    fn load_sleep_entries(&self) -> Result<Vec<SleepEntry>>;
    fn load_performance_entries(&self) -> Result<Vec<PerformanceEntry>>;
    fn append_sleep_entry(&mut self, entry: SleepEntry) -> Result<Recorded>;
    fn append_performance_entry(&mut self, entry: PerformanceEntry) -> Result<Recorded>;
    fn backup(&self) -> Result<BackupId>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(BACKUP_DIR))?;
        fs::create_dir_all(dir.join(REPORTS_DIR))?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sleep_path(&self) -> PathBuf {
        self.dir.join(SLEEP_FILE)
    }

    fn performance_path(&self) -> PathBuf {
        self.dir.join(PERFORMANCE_FILE)
    }

    /// Backup ids, oldest first.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.dir.join(BACKUP_DIR))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort_by_cached_key(|id| backup_order(id));
        Ok(ids)
    }

    pub fn save_report(&self, content: &str) -> Result<PathBuf> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let reports = self.dir.join(REPORTS_DIR);
        fs::create_dir_all(&reports)?;

        let mut path = reports.join(format!("sleep_analysis_report_{}.txt", stamp));
        let mut n = 1;
        while path.exists() {
            path = reports.join(format!("sleep_analysis_report_{}_{}.txt", stamp, n));
            n += 1;
        }
        fs::write(&path, content)?;
        info!(path = %path.display(), "saved report");
        Ok(path)
    }
}

fn load_collection<T: DeserializeOwned + Dated>(path: &Path) -> Result<Vec<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(JournalError::DataUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<T> = serde_json::from_str(&data).map_err(|e| JournalError::DataUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    entries.sort_by_key(|e| e.date());
    info!(path = %path.display(), count = entries.len(), "loaded entries");
    Ok(entries)
}

fn save_collection<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    let data = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn append_collection<T>(path: &Path, entry: T) -> Result<Recorded>
where
    T: Serialize + DeserializeOwned + Dated,
{
    let mut entries: Vec<T> = load_collection(path)?;
    let date = entry.date();
    let before = entries.len();
    entries.retain(|e| e.date() != date);
    let recorded = if entries.len() < before {
        warn!(%date, "replacing existing entry for date");
        Recorded::Superseded
    } else {
        Recorded::New
    };
    entries.push(entry);
    entries.sort_by_key(|e| e.date());
    save_collection(path, &entries)?;
    info!(path = %path.display(), %date, "appended entry");
    Ok(recorded)
}

impl JournalStore for FileStore {
    fn load_sleep_entries(&self) -> Result<Vec<SleepEntry>> {
        load_collection(&self.sleep_path())
    }

    fn load_performance_entries(&self) -> Result<Vec<PerformanceEntry>> {
        load_collection(&self.performance_path())
    }

    fn append_sleep_entry(&mut self, entry: SleepEntry) -> Result<Recorded> {
        append_collection(&self.sleep_path(), entry)
    }

    fn append_performance_entry(&mut self, entry: PerformanceEntry) -> Result<Recorded> {
        append_collection(&self.performance_path(), entry)
    }

    /// Copy both collections into a fresh `backup/<timestamp>` directory.
    /// Never reuses a directory; a numeric suffix separates same-second backups.
    fn backup(&self) -> Result<BackupId> {
        let root = self.dir.join(BACKUP_DIR);
        fs::create_dir_all(&root)?;
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let mut id = stamp.clone();
        let mut n = 1;
        let path = loop {
            let candidate = root.join(&id);
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    id = format!("{}_{}", stamp, n);
                    n += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        for source in [self.sleep_path(), self.performance_path()] {
            if let Some(name) = source.file_name() {
                if source.exists() {
                    fs::copy(&source, path.join(name))?;
                }
            }
        }
        info!(%id, path = %path.display(), "created backup");
        Ok(BackupId { id, path })
    }
}

/// Sort key for backup ids: the timestamp, then the numeric collision suffix.
fn backup_order(id: &str) -> (String, u32) {
    match id.rsplit_once('_') {
        Some((stamp, n)) if stamp.contains('_') => (stamp.to_string(), n.parse().unwrap_or(0)),
        _ => (id.to_string(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Rating, parse_date, parse_time};

    fn sleep(date: &str, quality: u8) -> SleepEntry {
        SleepEntry::new(
            parse_date(date).unwrap(),
            parse_time("23:00").unwrap(),
            parse_time("07:00").unwrap(),
            Rating::new(quality).unwrap(),
        )
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.load_sleep_entries().unwrap().is_empty());
        assert!(store.load_performance_entries().unwrap().is_empty());
    }

    #[test]
    fn test_append_keeps_date_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.append_sleep_entry(sleep("2024-01-03", 5)).unwrap();
        store.append_sleep_entry(sleep("2024-01-01", 7)).unwrap();
        store.append_sleep_entry(sleep("2024-01-02", 6)).unwrap();

        let dates: Vec<_> = store
            .load_sleep_entries()
            .unwrap()
            .iter()
            .map(|e| e.date().to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn test_reentry_supersedes_same_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.append_sleep_entry(sleep("2024-01-01", 4)).unwrap(), Recorded::New);
        assert_eq!(
            store.append_sleep_entry(sleep("2024-01-01", 9)).unwrap(),
            Recorded::Superseded
        );

        let entries = store.load_sleep_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quality().value(), 9);
    }

    #[test]
    fn test_corrupt_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(SLEEP_FILE), "{ not json").unwrap();

        let err = store.load_sleep_entries().unwrap_err();
        assert!(matches!(err, JournalError::DataUnavailable { .. }));

        // Appending must not clobber unreadable data.
        assert!(store.append_sleep_entry(sleep("2024-01-01", 5)).is_err());
        assert_eq!(fs::read_to_string(dir.path().join(SLEEP_FILE)).unwrap(), "{ not json");
    }

    #[test]
    fn test_backups_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.append_sleep_entry(sleep("2024-01-01", 8)).unwrap();

        let first = store.backup().unwrap();
        let second = store.backup().unwrap();
        assert_ne!(first.id, second.id);
        assert!(first.path.join(SLEEP_FILE).exists());
        assert!(second.path.join(SLEEP_FILE).exists());
        assert!(!second.path.join(PERFORMANCE_FILE).exists());
        assert_eq!(store.list_backups().unwrap().len(), 2);
        assert_eq!(store.load_sleep_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_backups_list_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for id in ["20240101_120000_10", "20240101_120000_2", "20240102_080000", "20240101_120000"] {
            fs::create_dir(dir.path().join(BACKUP_DIR).join(id)).unwrap();
        }
        assert_eq!(
            store.list_backups().unwrap(),
            ["20240101_120000", "20240101_120000_2", "20240101_120000_10", "20240102_080000"]
        );
    }

    #[test]
    fn test_save_report_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let a = store.save_report("first").unwrap();
        let b = store.save_report("second").unwrap();
        assert_ne!(a, b);
        assert_eq!(fs::read_to_string(a).unwrap(), "first");
        assert_eq!(fs::read_to_string(b).unwrap(), "second");
    }
}
