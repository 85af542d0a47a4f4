use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::features::{FeatureSet, MissingPolicy, Scaling, VectorizerConfig};
use crate::similarity::{IndexConfig, Metric};
use crate::storyteller::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const DEFAULT_DATA_PATH: &str = "data/dataPlayerC.csv";
pub const DEFAULT_CONFIG_PATH: &str = "data/config.json";
pub const DEFAULT_TOP_N: usize = 10;
pub const MAX_TOP_N: usize = 50;

/// Startup settings. Unparseable values fall back to their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub config_path: PathBuf,
    pub index: IndexConfig,
    pub min_minutes: Option<f64>,
    pub top_n: usize,
    pub api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Loads `.env.local` then `.env` before reading the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::dotenv();
        Self::from_lookup(opt_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_path = lookup("SCOUT_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let config_path = lookup("SCOUT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let vectorizer = VectorizerConfig {
            features: lookup("SCOUT_FEATURES")
                .and_then(|v| FeatureSet::from_name(&v))
                .unwrap_or_default(),
            scaling: lookup("SCOUT_SCALING")
                .and_then(|v| Scaling::from_name(&v))
                .unwrap_or_default(),
            missing: lookup("SCOUT_MISSING")
                .and_then(|v| MissingPolicy::from_name(&v))
                .unwrap_or_default(),
            allow_partial: lookup("SCOUT_ALLOW_PARTIAL")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };
        let metric = lookup("SCOUT_METRIC")
            .and_then(|v| Metric::from_name(&v))
            .unwrap_or_default();

        let min_minutes = lookup("SCOUT_MIN_MINUTES")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0);
        let top_n = lookup("SCOUT_TOP_N")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N)
            .clamp(1, MAX_TOP_N);

        let api_key = lookup("GEMINI_API_KEY").or_else(|| load_api_key(&config_path));

        Self {
            data_path,
            config_path,
            index: IndexConfig { vectorizer, metric },
            min_minutes,
            top_n,
            api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            log_file: lookup("SCOUT_LOG_FILE").map(PathBuf::from),
        }
    }
}

#[derive(Deserialize)]
struct KeyFile {
    #[serde(rename = "API_KEY", default)]
    api_key: Option<String>,
}

/// Reads `API_KEY` from a JSON config file. A missing or unreadable file is
/// not an error; the AI screen simply stays disabled.
pub fn load_api_key(path: &Path) -> Option<String> {
    read_key_file(path)
        .ok()
        .flatten()
        .filter(|k| !k.trim().is_empty())
}

fn read_key_file(path: &Path) -> Result<Option<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: KeyFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed.api_key)
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[("SCOUT_CONFIG_PATH", "/nonexistent/config.json")]));
        assert_eq!(cfg.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(cfg.index, IndexConfig::default());
        assert_eq!(cfg.top_n, DEFAULT_TOP_N);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.gemini_model, DEFAULT_MODEL);
    }

    #[test]
    fn parses_and_clamps_values() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SCOUT_SCALING", "zscore"),
            ("SCOUT_MISSING", "mean"),
            ("SCOUT_METRIC", "euclidean"),
            ("SCOUT_FEATURES", "fw"),
            ("SCOUT_TOP_N", "500"),
            ("SCOUT_MIN_MINUTES", "900"),
            ("GEMINI_API_KEY", "abc"),
        ]));
        assert_eq!(cfg.index.vectorizer.scaling, Scaling::ZScore);
        assert_eq!(cfg.index.vectorizer.missing, MissingPolicy::Mean);
        assert_eq!(cfg.index.vectorizer.features, FeatureSet::Forward);
        assert_eq!(cfg.index.metric, Metric::Euclidean);
        assert_eq!(cfg.top_n, MAX_TOP_N);
        assert_eq!(cfg.min_minutes, Some(900.0));
        assert_eq!(cfg.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SCOUT_SCALING", "log"),
            ("SCOUT_TOP_N", "many"),
            ("SCOUT_MIN_MINUTES", "-5"),
            ("SCOUT_CONFIG_PATH", "/nonexistent/config.json"),
        ]));
        assert_eq!(cfg.index.vectorizer.scaling, Scaling::MinMax);
        assert_eq!(cfg.top_n, DEFAULT_TOP_N);
        assert!(cfg.min_minutes.is_none());
    }

    #[test]
    fn reads_key_from_config_file() {
        let dir = env::temp_dir().join(format!("scout-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{"API_KEY": "from-file"}"#).unwrap();
        assert_eq!(load_api_key(&path).as_deref(), Some("from-file"));

        fs::write(&path, r#"{"API_KEY": ""}"#).unwrap();
        assert!(load_api_key(&path).is_none());
        fs::write(&path, "{oops").unwrap();
        assert!(load_api_key(&path).is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
