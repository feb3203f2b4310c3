//! Search configuration.
//!
//! [`Target`] describes where the endpoint lives; [`SearchConfig`] is the
//! immutable record the search engine runs against. The configuration is
//! validated once, before any worker is created.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of concurrent workers.
pub const DEFAULT_THREADS: usize = 10;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry count for transient errors.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay before the first retry; doubled for every further retry.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Default endpoint path.
pub const DEFAULT_ENDPOINT: &str = "/pin";

/// Default name of the PIN parameter.
pub const DEFAULT_PARAM: &str = "pin";

/// Default JSON key holding the flag in a success body.
pub const DEFAULT_FLAG_KEY: &str = "flag";

/// HTTP method used to submit a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// PIN goes into the query string.
    #[default]
    Get,
    /// PIN goes into a form-encoded body.
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(ConfigError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Location of the credential-check endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub use_https: bool,
    pub endpoint: String,
}

impl Target {
    /// Creates a plain-HTTP target at the default endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_https: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Switches the target to HTTPS.
    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    /// Sets the endpoint path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// URL scheme for this target.
    pub fn scheme(&self) -> &'static str {
        if self.use_https {
            "https"
        } else {
            "http"
        }
    }

    /// Endpoint path with a guaranteed leading slash.
    pub fn normalized_endpoint(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        }
    }

    /// Builds `scheme://host:port/endpoint`.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let raw = format!(
            "{}://{}:{}{}",
            self.scheme(),
            host,
            self.port,
            self.normalized_endpoint()
        );
        Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}

/// Immutable configuration of one search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Full endpoint URL (query string is appended per attempt for GET).
    pub target_url: Url,
    pub method: HttpMethod,
    /// Name of the query/body parameter carrying the PIN.
    pub param_name: String,
    /// JSON key holding the flag; `None` disables flag extraction.
    pub flag_key: Option<String>,
    pub thread_count: usize,
    /// Per network call.
    pub timeout: Duration,
    /// Sleep after each completed attempt, per worker.
    pub delay: Duration,
    pub max_retries: u32,
    pub stop_on_found: bool,
    pub backoff_base: Duration,
    /// Fraction in [0, 1] of random extra delay added to each backoff.
    pub jitter: f64,
    pub user_agent: String,
    /// Explicit proxy for every request (e.g. an intercepting proxy).
    pub proxy: Option<Url>,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` when no explicit proxy is set.
    pub system_proxy: bool,
}

impl SearchConfig {
    /// Creates a configuration with defaults for everything but the URL.
    pub fn new(target_url: Url) -> Self {
        Self {
            target_url,
            method: HttpMethod::Get,
            param_name: DEFAULT_PARAM.to_string(),
            flag_key: Some(DEFAULT_FLAG_KEY.to_string()),
            thread_count: DEFAULT_THREADS,
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            max_retries: DEFAULT_MAX_RETRIES,
            stop_on_found: false,
            backoff_base: DEFAULT_BACKOFF_BASE,
            jitter: 0.0,
            user_agent: format!("pin-forge/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
            system_proxy: true,
        }
    }

    /// Creates a configuration for a [`Target`].
    pub fn for_target(target: &Target) -> Result<Self, ConfigError> {
        Ok(Self::new(target.url()?))
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_param_name(mut self, name: impl Into<String>) -> Self {
        self.param_name = name.into();
        self
    }

    /// Sets the flag key. An empty key disables flag extraction.
    pub fn with_flag_key(mut self, key: Option<String>) -> Self {
        self.flag_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_stop_on_found(mut self, stop: bool) -> Self {
        self.stop_on_found = stop;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<Url>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Ignores proxy environment variables.
    pub fn without_system_proxy(mut self) -> Self {
        self.system_proxy = false;
        self
    }

    /// Checks every precondition of a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::InvalidThreadCount(self.thread_count));
        }

        match self.target_url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        if self.target_url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUrl {
                url: self.target_url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        if self.target_url.port() == Some(0) {
            return Err(ConfigError::InvalidPort(0));
        }

        if self.param_name.trim().is_empty() {
            return Err(ConfigError::EmptyParam);
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(self.timeout));
        }

        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }

        if let Some(proxy) = &self.proxy {
            if !matches!(proxy.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidProxy(proxy.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> SearchConfig {
        SearchConfig::for_target(&Target::new("127.0.0.1", 8080)).expect("valid target")
    }

    #[test]
    fn test_target_url_building() {
        let target = Target::new("10.10.10.5", 1337).with_endpoint("check");
        let url = target.url().expect("url");
        assert_eq!(url.as_str(), "http://10.10.10.5:1337/check");

        let target = Target::new("ctf.local", 443)
            .with_https(true)
            .with_endpoint("/api/pin");
        assert_eq!(target.url().expect("url").as_str(), "https://ctf.local/api/pin");
    }

    #[test]
    fn test_target_rejects_bad_input() {
        assert_eq!(Target::new("  ", 80).url(), Err(ConfigError::EmptyHost));
        assert_eq!(Target::new("host", 0).url(), Err(ConfigError::InvalidPort(0)));
        assert!(matches!(
            Target::new("bad host", 80).url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = sample_config();
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.param_name, "pin");
        assert_eq!(config.flag_key.as_deref(), Some("flag"));
        assert_eq!(config.thread_count, 10);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.delay, Duration::ZERO);
        assert_eq!(config.max_retries, 3);
        assert!(!config.stop_on_found);
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = sample_config()
            .with_method(HttpMethod::Post)
            .with_param_name("code")
            .with_flag_key(Some(String::new()))
            .with_threads(32)
            .with_timeout(Duration::from_secs(2))
            .with_delay(Duration::from_millis(100))
            .with_max_retries(1)
            .with_stop_on_found(true)
            .with_jitter(0.5);

        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.param_name, "code");
        assert_eq!(config.flag_key, None);
        assert_eq!(config.thread_count, 32);
        assert_eq!(config.delay, Duration::from_millis(100));
        assert!(config.stop_on_found);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_errors() {
        assert_eq!(
            sample_config().with_threads(0).validate(),
            Err(ConfigError::InvalidThreadCount(0))
        );
        assert_eq!(
            sample_config().with_param_name(" ").validate(),
            Err(ConfigError::EmptyParam)
        );
        assert_eq!(
            sample_config().with_timeout(Duration::ZERO).validate(),
            Err(ConfigError::InvalidTimeout(Duration::ZERO))
        );
        assert_eq!(
            sample_config().with_jitter(1.5).validate(),
            Err(ConfigError::InvalidJitter(1.5))
        );

        let proxy = Url::parse("ftp://127.0.0.1:8080").expect("url");
        assert!(matches!(
            sample_config().with_proxy(Some(proxy)).validate(),
            Err(ConfigError::InvalidProxy(_))
        ));

        let ftp = SearchConfig::new(Url::parse("ftp://example.com/pin").expect("url"));
        assert_eq!(
            ftp.validate(),
            Err(ConfigError::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn test_http_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!(" POST ".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert!(matches!(
            "PUT".parse::<HttpMethod>(),
            Err(ConfigError::UnsupportedMethod(_))
        ));
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }
}
