use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use simplelog::WriteLogger;

use crate::config::AppConfig;

/// Number of daily log files kept.
pub const RETAINED_LOG_FILES: usize = 7;

static LOG_FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^statusreport-\d{8}\.log$").unwrap());

pub fn log_file_name(date: NaiveDate) -> String {
    format!("statusreport-{}.log", date.format("%Y%m%d"))
}

/// Deletes all but the newest `retain` daily log files in `dir`. Returns how many were removed.
pub fn prune_old_logs(dir: &Path, retain: usize) -> io::Result<usize> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| LOG_FILE_RE.is_match(name))
        })
        .collect();
    // The date in the name sorts chronologically.
    logs.sort();
    let excess = logs.len().saturating_sub(retain);
    for path in &logs[..excess] {
        fs::remove_file(path)?;
    }
    Ok(excess)
}

/// Installs the file logger for today and prunes old files. Returns the log file path.
pub fn init_logging(config: &AppConfig) -> Result<PathBuf> {
    let dir = &config.log_path;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let level = config.level_filter();
    WriteLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_max_level(level)
            .add_filter_ignore_str("html5ever")
            .build(),
        file,
    )?;

    let removed = prune_old_logs(dir, RETAINED_LOG_FILES)
        .with_context(|| format!("Failed to prune logs in {}", dir.display()))?;
    if removed > 0 {
        debug!("Removed {removed} old log file(s)");
    }
    info!("Logging to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(log_file_name(date), "statusreport-20240309.log");
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for day in 1..=9 {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            fs::write(dir.path().join(log_file_name(date)), "x").unwrap();
        }
        fs::write(dir.path().join("other.log"), "x").unwrap();

        assert_eq!(prune_old_logs(dir.path(), RETAINED_LOG_FILES).unwrap(), 2);
        assert!(!dir.path().join("statusreport-20240102.log").exists());
        assert!(dir.path().join("statusreport-20240103.log").exists());
        assert!(dir.path().join("other.log").exists());
        assert_eq!(prune_old_logs(dir.path(), RETAINED_LOG_FILES).unwrap(), 0);
    }
}
