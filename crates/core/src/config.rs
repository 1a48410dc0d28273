use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

static DEFAULT_BASE_URL: &str = "http://localhost:8082/api";
static ENV_API_URL: &str = "TASKDECK_API_URL";
static ENV_TIMEOUT_MS: &str = "TASKDECK_TIMEOUT_MS";
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    base_url: String,
    timeout: Duration,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the API endpoint and timeout using the provided
    /// overrides, environment variables, and defaults.
    pub fn discover(
        base_url_override: Option<String>,
        timeout_ms_override: Option<u64>,
    ) -> Result<Self> {
        Self::resolve(base_url_override, timeout_ms_override, |key| env::var(key).ok())
    }

    /// Construct [`AppConfig`] directly, validating the base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("Invalid API base URL '{}'", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Unsupported API base URL scheme '{}': expected http or https",
                parsed.scheme()
            ));
        }
        if timeout.is_zero() {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }
        Ok(Self { base_url, timeout })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn resolve<F>(
        base_url_override: Option<String>,
        timeout_ms_override: Option<u64>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = base_url_override
            .or_else(|| lookup(ENV_API_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match timeout_ms_override {
            Some(ms) => Duration::from_millis(ms),
            None => match lookup(ENV_TIMEOUT_MS) {
                Some(raw) => {
                    let ms = raw.trim().parse::<u64>().with_context(|| {
                        format!(
                            "{} must be a number of milliseconds, got '{}'",
                            ENV_TIMEOUT_MS, raw
                        )
                    })?;
                    Duration::from_millis(ms)
                }
                None => DEFAULT_TIMEOUT,
            },
        };

        Self::new(base_url, timeout)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = AppConfig::resolve(None, None, lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn environment_beats_defaults_and_overrides_beat_environment() {
        let env = lookup_from(&[
            (ENV_API_URL, "https://tasks.example.com/api"),
            (ENV_TIMEOUT_MS, "750"),
        ]);
        let config = AppConfig::resolve(None, None, &env).unwrap();
        assert_eq!(config.base_url(), "https://tasks.example.com/api");
        assert_eq!(config.timeout(), Duration::from_millis(750));

        let config =
            AppConfig::resolve(Some("http://127.0.0.1:9000".into()), Some(100), &env).unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.timeout(), Duration::from_millis(100));
    }

    #[test]
    fn rejects_bad_urls_and_timeouts() {
        assert!(AppConfig::new("not a url", DEFAULT_TIMEOUT).is_err());
        assert!(AppConfig::new("ftp://example.com", DEFAULT_TIMEOUT).is_err());
        assert!(AppConfig::new(DEFAULT_BASE_URL, Duration::ZERO).is_err());

        let env = lookup_from(&[(ENV_TIMEOUT_MS, "soon")]);
        assert!(AppConfig::resolve(None, None, env).is_err());
    }
}
