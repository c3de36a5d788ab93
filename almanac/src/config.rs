//! Almanac configuration

use crate::error::{AlmanacError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the user cache dir holding everything Almanac writes
const CACHE_SUBDIR: &str = "almanac/contacts";
const CACHE_FILE: &str = "contacts.json";
const AVATAR_SUBDIR: &str = "avatars";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlmanacConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Cache file; defaults to `<cache dir>/almanac/contacts/contacts.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Avatar directory; defaults to `avatars/` next to the cache file
    #[serde(default)]
    pub avatar_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Buffered engine events before new ones are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { event_capacity: default_event_capacity() }
    }
}

fn default_event_capacity() -> usize { 100 }

impl CacheConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_cache_path)
    }

    pub fn avatar_dir(&self) -> PathBuf {
        if let Some(dir) = &self.avatar_dir {
            return dir.clone();
        }
        self.cache_path()
            .parent()
            .map(|dir| dir.join(AVATAR_SUBDIR))
            .unwrap_or_else(|| PathBuf::from(AVATAR_SUBDIR))
    }
}

/// `<user cache dir>/almanac/contacts/contacts.json`
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_default()
        .join(CACHE_SUBDIR)
        .join(CACHE_FILE)
}

/// Load configuration, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> Result<AlmanacConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AlmanacError::Config(format!("{}: {}", path.display(), e)))
    } else {
        Ok(AlmanacConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("almanac.yaml")).unwrap();
        assert_eq!(config.engine.event_capacity, 100);
        assert!(config.cache.cache_path().ends_with("almanac/contacts/contacts.json"));
    }

    #[test]
    fn test_partial_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("almanac.yaml");
        std::fs::write(&path, "cache:\n  path: /var/tmp/contacts.json\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache.cache_path(), PathBuf::from("/var/tmp/contacts.json"));
        assert_eq!(config.cache.avatar_dir(), PathBuf::from("/var/tmp/avatars"));
        assert_eq!(config.engine.event_capacity, 100);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("almanac.yaml");
        std::fs::write(&path, "engine: [unclosed").unwrap();

        assert!(matches!(load_config(&path), Err(AlmanacError::Config(_))));
    }
}
