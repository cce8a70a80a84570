use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{JournalError, Result};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where entry files, backups and saved reports live.
    pub data_dir: PathBuf,
    /// Entries shown by the history views.
    pub recent_count: usize,
    /// Share of dream nights a theme must appear in to count as recurring.
    pub recurring_threshold: f64,
    /// Width of the text bar charts in reports.
    pub chart_width: usize,
    /// Window for moving averages in trend views.
    pub trend_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            recent_count: 10,
            recurring_threshold: 0.2,
            chart_width: 40,
            trend_window: 7,
        }
    }
}

impl Config {
    /// Read `path` if given, else `config.json` in the working directory if
    /// present, else defaults. An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(JournalError::DataUnavailable {
                    path,
                    reason: "config file not found".into(),
                });
            }
            return Ok(Config::default());
        }

        let data = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&data).map_err(|e| JournalError::DataUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.recurring_threshold) {
            return Err(JournalError::invalid("recurring_threshold must be between 0 and 1"));
        }
        if self.trend_window == 0 {
            return Err(JournalError::invalid("trend_window must be at least 1"));
        }
        Ok(())
    }
}
