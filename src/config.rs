use serde::Deserialize;
use std::{fs, path::Path};

use crate::payslip::parser::DEFAULT_MATERIALITY_THRESHOLD;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: String,
    pub log_filter: String,
    pub parser: ParserConfig,
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "salary/salaries.db".to_string(),
            log_filter: "info".to_string(),
            parser: ParserConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Minimum size of each amount in the unlabeled totals pair.
    pub materiality_threshold: i64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub recent_count: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_count: 5 }
    }
}

impl Config {
    /// Load from a TOML file; a missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            db_path = "/tmp/pay.db"

            [parser]
            materiality_threshold = 50000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.db_path, "/tmp/pay.db");
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.parser.materiality_threshold, 50_000);
        assert_eq!(cfg.dashboard.recent_count, 5);
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = Config::load("/nonexistent/payslip_ledger.toml").unwrap();
        assert_eq!(cfg.parser.materiality_threshold, 10_000);
        assert_eq!(cfg.db_path, "salary/salaries.db");
    }
}
