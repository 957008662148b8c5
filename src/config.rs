//! Report configuration.
//!
//! Read from a TOML file (`bridge-report.toml` by default). CLI flags
//! override file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::schema::decisions;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "bridge-report.toml";

/// Top-level config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub report: ReportOptions,
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Consolidated decisions log (required at report time).
    #[serde(default = "default_decisions_source")]
    pub decisions: SourceConfig,

    /// Participants list; absent disables the funnel section.
    #[serde(default)]
    pub participants: Option<SourceConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            decisions: default_decisions_source(),
            participants: None,
        }
    }
}

fn default_decisions_source() -> SourceConfig {
    SourceConfig {
        path: PathBuf::from("Consolidado_Bridge_2025.xlsx"),
        sheet: Some(decisions::DEFAULT_SHEET.to_string()),
        separator: default_separator(),
    }
}

/// One tabular input: a CSV file or a sheet inside a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,

    /// Workbook sheet name; the first sheet when unset. Ignored for CSV.
    #[serde(default)]
    pub sheet: Option<String>,

    /// CSV field separator.
    #[serde(default = "default_separator")]
    pub separator: u8,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
            separator: default_separator(),
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

fn default_separator() -> u8 {
    b','
}

/// What to do with decision rows whose `Quando` cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Keep the row; it still counts everywhere except the time series.
    #[default]
    Retain,
    /// Remove the row at load time.
    Drop,
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Rows in the top-neighborhoods tables.
    #[serde(default = "default_table_top_n")]
    pub table_top_n: usize,

    /// Bars in the neighborhood chart.
    #[serde(default = "default_chart_top_n")]
    pub chart_top_n: usize,

    #[serde(default)]
    pub date_policy: DatePolicy,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            table_top_n: default_table_top_n(),
            chart_top_n: default_chart_top_n(),
            date_policy: DatePolicy::default(),
        }
    }
}

fn default_table_top_n() -> usize {
    5
}
fn default_chart_top_n() -> usize {
    10
}

/// Load the config from the default file name. Returns defaults if it does not exist.
pub fn load_config() -> Result<ReportConfig> {
    let path = Path::new(CONFIG_FILE_NAME);
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(ReportConfig::default());
    }
    load_config_from(path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<ReportConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| ReportError::Config(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let config = ReportConfig::default();
        assert_eq!(config.report.table_top_n, 5);
        assert_eq!(config.report.chart_top_n, 10);
        assert_eq!(config.report.date_policy, DatePolicy::Retain);
        assert_eq!(
            config.sources.decisions.sheet.as_deref(),
            Some("2025 Consolidado")
        );
        assert!(config.sources.participants.is_none());
    }

    #[test]
    fn parses_sources_and_overrides() {
        let toml_str = r#"
[sources.decisions]
path = "data/decisoes.csv"
separator = 59

[sources.participants]
path = "data/Participantes_Start.xlsx"
sheet = "Start"

[report]
table_top_n = 3
date_policy = "drop"
"#;
        let config: ReportConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sources.decisions.path, PathBuf::from("data/decisoes.csv"));
        assert_eq!(config.sources.decisions.separator, b';');
        assert_eq!(config.sources.decisions.sheet, None);
        let participants = config.sources.participants.expect("participants");
        assert_eq!(participants.sheet.as_deref(), Some("Start"));
        assert_eq!(config.report.table_top_n, 3);
        assert_eq!(config.report.chart_top_n, 10);
        assert_eq!(config.report.date_policy, DatePolicy::Drop);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[report\ntable_top_n = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ReportError::Config(_))));
    }
}
