use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Artist page scraped when the config file sets nothing else.
const DEFAULT_ARTIST_URL: &str =
    "https://www.musicmetricsvault.com/artists/anna-vissi/3qg78GGGWP04yTv0ZQMsXl";

/// Source attribution written into the total-history record.
const DEFAULT_SOURCE_LABEL: &str = "MusicMetricsVault.com";

/// The source blocks default HTTP client identifiers, so a browser
/// User-Agent is required.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Artist page to scrape.
    pub artist_url: String,
    /// Free-text source attribution stored with every total-history row.
    pub source_label: String,
    /// Custom artifact directory (overrides XDG default).
    pub data_dir: Option<PathBuf>,
    /// HTTP fetch settings.
    pub fetch: FetchConfig,
    /// Title exclusion rules (misattributed tracks, unwanted editions).
    pub exclusions: ExclusionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artist_url: DEFAULT_ARTIST_URL.to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            data_dir: None,
            fetch: FetchConfig::default(),
            exclusions: ExclusionConfig::default(),
        }
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts before the fetch is a terminal failure.
    pub retries: u32,
    /// Fixed delay between attempts, in seconds (no backoff).
    pub wait_secs: u64,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            wait_secs: 2,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Title exclusion rules, evaluated against normalized titles.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Word-boundary literal matches (e.g. a misattributed track name).
    pub words: Vec<String>,
    /// Exact whole-title matches (e.g. a specific remaster edition).
    pub phrases: Vec<String>,
}

impl AppConfig {
    /// Load config from `~/.config/streamvault/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Resolve the artifact directory: explicit override > XDG default.
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default artifact directory using the XDG data directory.
pub fn default_data_dir() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.to_path_buf()
    } else {
        // Fallback: current directory
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.artist_url, DEFAULT_ARTIST_URL);
        assert_eq!(config.fetch.retries, 3);
        assert!(config.exclusions.words.is_empty());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            artist_url = "https://example.com/artists/x"

            [fetch]
            retries = 5

            [exclusions]
            words = ["Mouri"]
            phrases = ["Dodeka (2021 Remaster)"]
            "#,
        )
        .unwrap();
        assert_eq!(config.artist_url, "https://example.com/artists/x");
        assert_eq!(config.fetch.retries, 5);
        assert_eq!(config.fetch.wait_secs, 2);
        assert_eq!(config.exclusions.words, vec!["Mouri".to_string()]);
        assert_eq!(config.exclusions.phrases.len(), 1);
    }
}
