//! Data directory and supervisor configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use sessionkeeper_types::{ConfigError, SupervisorConfig};
use validator::Validate;

const DATA_DIR: &str = ".sessionkeeper";
const CONFIG_FILE: &str = "sessionkeeper.json";

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "SESSIONKEEPER_DATA_DIR";

/// Get data directory path.
///
/// Priority:
/// 1. `SESSIONKEEPER_DATA_DIR` environment variable (for container deployments)
/// 2. `~/.sessionkeeper`
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var(DATA_DIR_ENV) {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::DataDir {
            message: "cannot determine home directory".to_string(),
        })?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| ConfigError::DataDir {
            message: format!("failed to create {}: {e}", data_dir.display()),
        })?;
    }

    Ok(data_dir)
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load and validate the config, falling back to defaults when absent.
pub fn load_config(data_dir: &Path) -> Result<SupervisorConfig, ConfigError> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(SupervisorConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| ConfigError::Io { path: path.display().to_string(), message: e.to_string() })?;
    let config: SupervisorConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse { message: e.to_string() })?;

    config.validate().map_err(|e| ConfigError::Invalid { message: e.to_string() })?;
    Ok(config)
}

pub fn save_config(data_dir: &Path, config: &SupervisorConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|e| ConfigError::Invalid { message: e.to_string() })?;

    let path = config_path(data_dir);
    let temp_path = data_dir.join(format!("{CONFIG_FILE}.tmp"));
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Parse { message: e.to_string() })?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::Io {
        path: temp_path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Io { path: path.display().to_string(), message: e.to_string() })
}

/// Update specific fields in the config.
pub fn update_config<F>(data_dir: &Path, updater: F) -> Result<SupervisorConfig, ConfigError>
where
    F: FnOnce(&mut SupervisorConfig),
{
    let mut config = load_config(data_dir)?;
    updater(&mut config);
    save_config(data_dir, &config)?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sessionkeeper_types::AccountSpec;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), SupervisorConfig::default());
    }

    #[test]
    fn test_update_persists() {
        let tmp = TempDir::new().unwrap();
        update_config(tmp.path(), |c| {
            c.health.check_interval_secs = 60;
            c.accounts.push(AccountSpec {
                id: "support".to_string(),
                display_name: Some("Support".to_string()),
                session_path: None,
            });
        })
        .unwrap();

        let loaded = load_config(tmp.path()).unwrap();
        assert_eq!(loaded.health.check_interval_secs, 60);
        assert_eq!(loaded.accounts.len(), 1);
        assert!(!tmp.path().join("sessionkeeper.json.tmp").exists());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(config_path(tmp.path()), r#"{"health": {"failure_threshold": 0}}"#).unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Invalid { .. })));

        fs::write(config_path(tmp.path()), "{oops").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Parse { .. })));
    }
}
