use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;

use crate::layout::{DEFAULT_HEADER_TEXT, LayoutOptions};
use crate::merge::SectionMergePolicy;
use crate::report::SectionKeywords;
use crate::validation::ValidationOptions;

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const LOG_PATH_VAR: &str = "LOG_PATH";
pub const LICENSE_PATH_VAR: &str = "LICENSE_PATH";

pub const DEFAULT_LOG_LEVEL: &str = "Information";
pub const DEFAULT_LOG_PATH: &str = "./logs/";
pub const DEFAULT_LICENSE_PATH: &str = "../reportmerge.lic";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_path: PathBuf,
    pub license_path: PathBuf,
    pub header_text: String,
    /// `.docx` to merge into instead of the converted HTML.
    pub template_path: Option<PathBuf>,
    pub merge_policy: SectionMergePolicy,
    pub allow_chart_scripts: bool,
    pub major_section_page_breaks: bool,
    pub keywords: SectionKeywords,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            license_path: PathBuf::from(DEFAULT_LICENSE_PATH),
            header_text: DEFAULT_HEADER_TEXT.to_string(),
            template_path: None,
            merge_policy: SectionMergePolicy::default(),
            allow_chart_scripts: false,
            major_section_page_breaks: false,
            keywords: SectionKeywords::default(),
        }
    }
}

impl AppConfig {
    /// Defaults when no file is given. Runs before the logger exists, so a named file that
    /// is missing or malformed is returned to the caller rather than logged.
    pub fn load(file_path: Option<&Path>) -> anyhow::Result<Self> {
        match file_path {
            Some(path) if !path.exists() => bail!("Configuration file {} not found", path.display()),
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Applies `LOG_LEVEL`, `LOG_PATH` and `LICENSE_PATH` from `lookup`; empty values are
    /// ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(level) = value(LOG_LEVEL_VAR) {
            self.log_level = level;
        }
        if let Some(path) = value(LOG_PATH_VAR) {
            self.log_path = PathBuf::from(path);
        }
        if let Some(path) = value(LICENSE_PATH_VAR) {
            self.license_path = PathBuf::from(path);
        }
        self
    }

    /// Maps the configured level name; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "information" | "info" => LevelFilter::Info,
            "warning" | "warn" => LevelFilter::Warn,
            "error" | "fatal" | "critical" => LevelFilter::Error,
            "off" | "none" => LevelFilter::Off,
            other => {
                log::warn!("Unknown log level '{other}', using Information");
                LevelFilter::Info
            }
        }
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            major_section_page_breaks: self.major_section_page_breaks,
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            allow_chart_scripts: self.allow_chart_scripts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.level_filter(), LevelFilter::Info);
        assert_eq!(config.header_text, "Enterprise AI Status Report");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"merge_policy": "ReplaceExisting", "keywords": {"risks": ["Issues"]}, "major_section_page_breaks": true}"#,
        )
        .unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.merge_policy, SectionMergePolicy::ReplaceExisting);
        assert_eq!(config.keywords.risks.keywords(), ["issues".to_string()]);
        assert_eq!(config.keywords.next_week, SectionKeywords::default().next_week);
        assert!(config.layout_options().major_section_page_breaks);
        assert_eq!(config.log_path, PathBuf::from(DEFAULT_LOG_PATH));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse configuration"));
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
        assert!(AppConfig::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::default().apply_overrides(|name| match name {
            LOG_LEVEL_VAR => Some("Debug".to_string()),
            LOG_PATH_VAR => Some("/var/log/reports".to_string()),
            LICENSE_PATH_VAR => Some(" ".to_string()),
            _ => None,
        });
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.log_path, PathBuf::from("/var/log/reports"));
        assert_eq!(config.license_path, PathBuf::from(DEFAULT_LICENSE_PATH));
    }
}
