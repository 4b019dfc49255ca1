//! Hark configuration
//!
//! TOML config with serde defaults for every field, so a partial file is
//! always usable. Discovery chain:
//!
//! 1. `$HARK_CONFIG` (explicit override)
//! 2. `$XDG_CONFIG_HOME/hark/config.toml`
//! 3. `~/.config/hark/config.toml`
//! 4. built-in defaults
//!
//! Both acceptance thresholds live here rather than in code: the default
//! values (0.2 lexical, 0.5 semantic) are starting points, not load-bearing
//! constants.

use crate::classifier::ClassifierConfig;
use crate::lexical::LexicalStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarkConfig {
    #[serde(default)]
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    #[serde(default = "default_catalogue_path")]
    pub path: PathBuf,
}

fn default_catalogue_path() -> PathBuf {
    data_dir().join("system_calls.json")
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            path: default_catalogue_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub strategy: LexicalStrategy,
    /// Acceptance threshold for lexical similarity (strict `>`).
    #[serde(default = "default_lexical_threshold")]
    pub threshold: f64,
}

fn default_lexical_threshold() -> f64 {
    0.2
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategy: LexicalStrategy::default(),
            threshold: default_lexical_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

fn default_audit_path() -> PathBuf {
    data_dir().join("audit.jsonl")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl HarkConfig {
    /// Load from the discovery chain, falling back to defaults when no file
    /// exists or the file is unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::discover_config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "bad config, using defaults");
                    }
                }
            }
        }
        Self::default()
    }

    fn discover_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HARK_CONFIG") {
            return Some(PathBuf::from(path));
        }
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("hark/config.toml"));
        }
        dirs::home_dir().map(|home| home.join(".config/hark/config.toml"))
    }
}

/// Data directory for the catalogue and audit store.
pub fn data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("HARK_DATA_DIR") {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .map(|d| d.join("hark"))
        .unwrap_or_else(|| PathBuf::from(".hark"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HarkConfig::default();
        assert_eq!(config.matcher.strategy, LexicalStrategy::TfIdf);
        assert_relative_eq!(config.matcher.threshold, 0.2);
        assert_relative_eq!(config.classifier.threshold, 0.5);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[matcher]\nstrategy = \"substring\"\n\n[classifier]\nthreshold = 0.33\n"
        )
        .unwrap();

        let config = HarkConfig::load_from(file.path());
        assert_eq!(config.matcher.strategy, LexicalStrategy::Substring);
        assert_relative_eq!(config.matcher.threshold, 0.2);
        assert_relative_eq!(config.classifier.threshold, 0.33);
        assert_eq!(config.classifier.model, "facebook/bart-large-mnli");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [[[").unwrap();
        let config = HarkConfig::load_from(file.path());
        assert_relative_eq!(config.matcher.threshold, 0.2);
    }

    #[test]
    fn test_roundtrip() {
        let config = HarkConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: HarkConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.matcher.strategy, config.matcher.strategy);
        assert_relative_eq!(parsed.classifier.threshold, config.classifier.threshold);
    }
}
