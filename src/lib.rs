//! Sleep and dream journal: record nightly sleep with optional dream
//! narratives and daily performance ratings, then explore dream themes,
//! trends and sleep/performance correlations.

pub mod config;
pub mod entry;
pub mod error;
pub mod journal;
pub mod menu;
pub mod report;
pub mod stats;
pub mod storage;
pub mod themes;

pub use config::Config;
pub use entry::{PerformanceEntry, Rating, SleepEntry};
pub use error::{JournalError, Result};
pub use journal::{Analysis, Journal};
pub use storage::{BackupId, FileStore, JournalStore, Recorded};
pub use themes::{Theme, ThemeMatch};
