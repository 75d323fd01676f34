//! Environment-driven runtime settings.
//!
//! Every variable is optional; blank values count as unset.

use crate::logging::default_log_level;
use crate::seed::FALLBACK_SHEET_SLUG;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TRACKER_DB_PATH";
pub const DATASET_PATH_ENV: &str = "SHEET_JSON_PATH";
pub const LOG_LEVEL_ENV: &str = "TRACKER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TRACKER_LOG_DIR";
pub const SHEET_SLUG_ENV: &str = "TRACKER_SHEET_SLUG";

const DB_FILE_NAME: &str = "tracker.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// SQLite snapshot database.
    pub db_path: PathBuf,
    /// Dataset used to seed an empty database. Defaults to
    /// `$HOME/Downloads/sheet.json` when a home directory is known.
    pub dataset_path: Option<PathBuf>,
    pub log_level: String,
    /// File logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub sheet_slug: String,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, e.g. a fixed map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let dataset_path = value(DATASET_PATH_ENV).map(PathBuf::from).or_else(|| {
            value("HOME")
                .or_else(|| value("USERPROFILE"))
                .map(|home| PathBuf::from(home).join("Downloads").join("sheet.json"))
        });

        Self {
            db_path: value(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME)),
            dataset_path,
            log_level: value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
            sheet_slug: value(SHEET_SLUG_ENV).unwrap_or_else(|| FALLBACK_SHEET_SLUG.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> TrackerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        TrackerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = config_from(&[(DB_PATH_ENV, "  ")]);
        assert_eq!(config.db_path, std::env::temp_dir().join("tracker.sqlite3"));
        assert_eq!(config.dataset_path, None);
        assert_eq!(config.log_dir, None);
        assert_eq!(config.sheet_slug, "striver-sde-sheet");
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn explicit_dataset_path_wins_over_home_default() {
        let config = config_from(&[("HOME", "/home/dev")]);
        assert_eq!(
            config.dataset_path,
            Some(PathBuf::from("/home/dev/Downloads/sheet.json"))
        );

        let config = config_from(&[("HOME", "/home/dev"), (DATASET_PATH_ENV, "/data/s.json")]);
        assert_eq!(config.dataset_path, Some(PathBuf::from("/data/s.json")));
    }
}
