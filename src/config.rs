use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BACKEND_URL: &str = "ALINK_BACKEND_URL";
pub const ENV_FALLBACK_URLS: &str = "ALINK_FALLBACK_URLS";
pub const ENV_DEV_PROXY: &str = "ALINK_DEV_PROXY";
pub const ENV_PROXY_URL: &str = "ALINK_PROXY_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub primary_url: String,
    #[serde(default)]
    pub fallback_urls: Vec<String>,
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Same-origin development proxy is reachable; put it first.
    #[serde(default)]
    pub dev_proxy: bool,
    /// Fallback URLs are alternate routes to one store, so writes may be
    /// re-sent to the next candidate.
    #[serde(default = "default_mirrored")]
    pub mirrored: bool,
}

fn default_mirrored() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
    #[serde(default = "default_wake_ms")]
    pub wake_ms: u64,
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,
    #[serde(default = "default_search_ms")]
    pub search_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_ms(),
            wake_ms: default_wake_ms(),
            probe_ms: default_probe_ms(),
            search_ms: default_search_ms(),
        }
    }
}

fn default_request_ms() -> u64 {
    15_000
}
fn default_wake_ms() -> u64 {
    60_000
}
fn default_probe_ms() -> u64 {
    10_000
}
fn default_search_ms() -> u64 {
    8_000
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
    pub fn wake(&self) -> Duration {
        Duration::from_millis(self.wake_ms)
    }
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
    pub fn search(&self) -> Duration {
        Duration::from_millis(self.search_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_probe_paths")]
    pub probe_paths: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_paths: default_probe_paths(),
        }
    }
}

fn default_probe_paths() -> Vec<String> {
    ["/api/health", "/api/auth/status", "/api/notes", "/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Directory holding `<category>.json` offline copies.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_dictionary_url")]
    pub dictionary_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            dictionary_url: default_dictionary_url(),
        }
    }
}

fn default_dictionary_url() -> String {
    "https://api.dictionaryapi.dev/api/v2/entries/en".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Token file location, defaulting to the platform data directory.
    pub fn resolved_token_path(&self) -> PathBuf {
        if let Some(path) = &self.token_path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("assistant-link")
            .join("token")
    }
}

impl Config {
    /// Config with only a primary backend; everything else defaulted.
    pub fn with_primary(primary_url: &str) -> Self {
        Self {
            backend: BackendConfig {
                primary_url: primary_url.to_string(),
                fallback_urls: Vec::new(),
                proxy_url: None,
                dev_proxy: false,
                mirrored: true,
            },
            timeouts: TimeoutConfig::default(),
            health: HealthConfig::default(),
            search: SearchConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Apply `ALINK_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.primary_url = url.trim().to_string();
        }
        if let Some(list) = lookup(ENV_FALLBACK_URLS) {
            self.backend.fallback_urls = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(flag) = lookup(ENV_DEV_PROXY) {
            self.backend.dev_proxy = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(url) = lookup(ENV_PROXY_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.proxy_url = Some(url.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url("backend.primary_url", &self.backend.primary_url)?;
        for url in &self.backend.fallback_urls {
            validate_url("backend.fallback_urls", url)?;
        }
        if let Some(proxy) = &self.backend.proxy_url {
            validate_url("backend.proxy_url", proxy)?;
        }

        let t = &self.timeouts;
        if t.request_ms == 0 || t.wake_ms == 0 || t.probe_ms == 0 || t.search_ms == 0 {
            bail!("timeouts.* must be > 0");
        }

        if self.health.probe_paths.is_empty() {
            bail!("health.probe_paths must not be empty");
        }
        if let Some(bad) = self.health.probe_paths.iter().find(|p| !p.starts_with('/')) {
            bail!("health.probe_paths entries must start with '/': '{}'", bad);
        }

        validate_url("search.dictionary_url", &self.search.dictionary_url)?;
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let parsed =
        url::Url::parse(value).with_context(|| format!("{} is not a valid URL: '{}'", field, value))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => bail!("{} must use http or https, got '{}'", field, other),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env_overrides();
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(s: &str) -> Config {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = parse(
            r#"
[backend]
primary_url = "https://api.example.com"
"#,
        );
        assert!(cfg.backend.fallback_urls.is_empty());
        assert!(cfg.backend.mirrored);
        assert!(!cfg.backend.dev_proxy);
        assert_eq!(cfg.timeouts.wake_ms, 60_000);
        assert_eq!(cfg.health.probe_paths[0], "/api/health");
        assert_eq!(cfg.health.probe_paths.last().unwrap(), "/");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_rejects_non_http_primary() {
        let cfg = Config::with_primary("ftp://files.example.com");
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("http or https"), "got: {}", err);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut cfg = Config::with_primary("https://api.example.com");
        cfg.timeouts.probe_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_probe_path() {
        let mut cfg = Config::with_primary("https://api.example.com");
        cfg.health.probe_paths = vec!["api/health".into()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::with_primary("https://api.example.com");
        let env: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "https://primary.example.com"),
            (ENV_FALLBACK_URLS, " https://a.example.com , ,https://b.example.com"),
            (ENV_DEV_PROXY, "true"),
            (ENV_PROXY_URL, "http://localhost:3000"),
        ]
        .into_iter()
        .collect();

        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.backend.primary_url, "https://primary.example.com");
        assert_eq!(
            cfg.backend.fallback_urls,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert!(cfg.backend.dev_proxy);
        assert_eq!(cfg.backend.proxy_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("alink.toml");
        std::fs::write(
            &path,
            r#"
[backend]
primary_url = "https://api.example.com"
fallback_urls = ["https://api2.example.com"]

[timeouts]
request_ms = 500
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.timeouts.request(), Duration::from_millis(500));
        assert_eq!(cfg.backend.fallback_urls.len(), 1);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/alink.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
