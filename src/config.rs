use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CACHE_FILE;
use crate::session::SessionOptions;

/// Environment variable that forces route regeneration
pub const FORCE_REGENERATE_ENV: &str = "DOCROUTE_FORCE_REGENERATE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocrouteConfig {
    pub store: Option<String>,
    pub cache: Option<String>,
    pub workers: Option<usize>,
    pub max_alias_depth: Option<usize>,
    pub module_scan_limit: Option<u32>,
}

impl DocrouteConfig {
    /// Session options with unset keys at their defaults
    pub fn session_options(&self) -> SessionOptions {
        let defaults = SessionOptions::default();
        SessionOptions {
            workers: self.workers.filter(|&n| n > 0).unwrap_or(defaults.workers),
            max_alias_chain: self.max_alias_depth.unwrap_or(defaults.max_alias_chain),
            module_scan_limit: self.module_scan_limit.unwrap_or(defaults.module_scan_limit),
        }
    }

    /// Config written by `docroute init`
    pub fn starter() -> Self {
        let defaults = SessionOptions::default();
        Self {
            store: Some("docs.json".to_string()),
            cache: Some(default_cache_path().to_string_lossy().into_owned()),
            workers: None,
            max_alias_depth: Some(defaults.max_alias_chain),
            module_scan_limit: Some(defaults.module_scan_limit),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("docroute.toml")
}

pub fn default_cache_path() -> PathBuf {
    PathBuf::from(".docroute").join(DEFAULT_CACHE_FILE)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<DocrouteConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DocrouteConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DocrouteConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Whether `DOCROUTE_FORCE_REGENERATE` asks for a fresh enumeration
pub fn force_regenerate_from_env() -> bool {
    std::env::var(FORCE_REGENERATE_ENV)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip_and_refuse_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docroute.toml");

        write_config(&path, &DocrouteConfig::starter(), false).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.store.as_deref(), Some("docs.json"));
        assert_eq!(loaded.max_alias_depth, Some(64));
        assert!(loaded.workers.is_none());

        assert!(write_config(&path, &DocrouteConfig::default(), false).is_err());
        write_config(&path, &DocrouteConfig::default(), true).unwrap();
        assert!(load_config(Some(&path)).unwrap().unwrap().store.is_none());
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_session_options_fill_defaults() {
        let config: DocrouteConfig = toml::from_str("workers = 3\nmax_alias_depth = 8\n").unwrap();
        let options = config.session_options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.max_alias_chain, 8);
        assert_eq!(options.module_scan_limit, 10_000);

        let zero: DocrouteConfig = toml::from_str("workers = 0").unwrap();
        assert!(zero.session_options().workers >= 1);
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("yes"));
        assert!(!is_truthy(""));
    }
}
