//! INI file configuration adapter.

use crate::domain::error::StockpickError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockpickError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| StockpickError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// An adapter with no sections; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
dir = stock_data
names_file = stock_names.csv

[scan]
rules = breakout_pullback, ma_fan
workers = 8
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("stock_data".to_string())
        );
        assert_eq!(
            adapter.get_string("scan", "rules"),
            Some("breakout_pullback, ma_fan".to_string())
        );
        assert_eq!(adapter.get_int("scan", "workers", 0), 8);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[scan]\nworkers = 4\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[fan]\nslow_ma = abc\n").unwrap();
        assert_eq!(adapter.get_int("fan", "slow_ma", 21), 21);
    }

    #[test]
    fn get_usize_clamps_negative_to_zero() {
        let adapter = FileConfigAdapter::from_string("[macd]\nvolume_window = -3\n").unwrap();
        assert_eq!(adapter.get_usize("macd", "volume_window", 5), 0);
        assert_eq!(adapter.get_usize("macd", "missing", 5), 5);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[breakout]\nsurge_pct = 9.8\nbad = x\n").unwrap();
        assert_eq!(adapter.get_double("breakout", "surge_pct", 0.0), 9.8);
        assert_eq!(adapter.get_double("breakout", "bad", 9.5), 9.5);
        assert_eq!(adapter.get_double("breakout", "missing", 9.5), 9.5);
    }

    #[test]
    fn get_bool_parses_common_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[scan]\na = true\nb = no\nc = 1\n").unwrap();
        assert!(adapter.get_bool("scan", "a", false));
        assert!(!adapter.get_bool("scan", "b", true));
        assert!(adapter.get_bool("scan", "c", false));
        assert!(adapter.get_bool("scan", "missing", true));
    }

    #[test]
    fn empty_adapter_yields_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("data", "dir"), None);
        assert_eq!(adapter.get_usize("scan", "workers", 0), 0);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[output]\ndir = results\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "dir"),
            Some("results".to_string())
        );
    }

    #[test]
    fn from_file_reports_config_parse_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(StockpickError::ConfigParse { .. })));
    }
}
