use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            user_id: default_user_id(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerlens")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledgerlens")
}

fn parse_settings(content: &str) -> Settings {
    match serde_json::from_str(content) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("settings file unreadable, using defaults: {e}");
            Settings::default()
        }
    }
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        parse_settings(&content)
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LedgerError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn db_path() -> PathBuf {
    get_data_dir().join(crate::db::DB_FILENAME)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            user_id: "acme".to_string(),
            currency_symbol: "$".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let loaded = parse_settings(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(loaded.user_id, "acme");
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.currency_symbol, "$");
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.user_id, "default");
        assert_eq!(s.currency_symbol, "₹");
        assert!(s.data_dir.ends_with("ledgerlens"));
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let s = parse_settings(r#"{"data_dir": "/tmp/test"}"#);
        assert_eq!(s.data_dir, "/tmp/test");
        assert_eq!(s.user_id, "default");
        assert_eq!(s.currency_symbol, "₹");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let s = parse_settings("{not json");
        assert_eq!(s.user_id, "default");
    }

    #[test]
    fn test_shellexpand_keeps_plain_paths() {
        assert_eq!(shellexpand_path("/definitely/not/here"), "/definitely/not/here");
    }
}
