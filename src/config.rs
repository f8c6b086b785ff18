//! Application configuration.
//!
//! Layering: optional TOML file (`$RANKALERT_CONFIG_PATH`, falling back
//! to `config/rankalert.toml`), then env-var overrides on top. `.env`
//! is loaded by the binary before this runs.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

const ENV_CONFIG_PATH: &str = "RANKALERT_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/rankalert.toml";

/// Default notification threshold: position moves below this many
/// ranks are not pushed. The stricter of the values the product has
/// shipped with; override with SIGNIFICANCE_THRESHOLD.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// Scheduler tick period; each tick processes rankings due per
    /// their own `update_frequency`.
    pub check_interval_secs: u64,
    pub significance_threshold: i64,
    pub onesignal_app_id: String,
    pub onesignal_api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/rankalert.db"),
            bind_addr: "0.0.0.0:8000".to_string(),
            check_interval_secs: 60,
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            onesignal_app_id: String::new(),
            onesignal_api_key: String::new(),
        }
    }
}

impl AppConfig {
    /// Load from file (if present) and apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::from_file(Path::new(&p))?,
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("RANKALERT_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RANKALERT_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = env_parse("CHECK_INTERVAL_SECS") {
            self.check_interval_secs = v;
        }
        if let Some(v) = env_parse("SIGNIFICANCE_THRESHOLD") {
            self.significance_threshold = v;
        }
        if let Ok(v) = std::env::var("ONESIGNAL_APP_ID") {
            self.onesignal_app_id = v;
        }
        if let Ok(v) = std::env::var("ONESIGNAL_API_KEY") {
            self.onesignal_api_key = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.check_interval_secs, 60);
        assert_eq!(cfg.significance_threshold, 3);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn toml_overrides_defaults_field_by_field() {
        let cfg: AppConfig = toml::from_str(
            r#"
            significance_threshold = 1
            onesignal_app_id = "app-123"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.significance_threshold, 1);
        assert_eq!(cfg.onesignal_app_id, "app-123");
        // untouched fields keep defaults
        assert_eq!(cfg.check_interval_secs, 60);
    }
}
