//! Gateway configuration.
//!
//! Configuration is an explicitly constructed object handed into `build_app`;
//! there is no ambient process-global state. `from_env` exists for the
//! binary, tests construct the struct directly.

use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:3333";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the identity/tenant backend.
    pub api_url: String,
    /// Listen address for the binary.
    pub bind_addr: String,
    /// Request the authentication bypass. Only honored in non-production
    /// builds; see [`GatewayConfig::auth_bypass_active`].
    pub auth_bypass: bool,
    /// Mark credential cookies `Secure`.
    pub secure_cookies: bool,
    /// Bounded timeout for every outbound backend call.
    pub backend_timeout: Duration,
}

impl GatewayConfig {
    /// Configuration with defaults for the given backend URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            auth_bypass: false,
            secure_cookies: !cfg!(debug_assertions),
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Read configuration from the environment (`API_URL`, `BIND_ADDR`,
    /// `AUTH_BYPASS`).
    pub fn from_env() -> Self {
        let api_url = std::env::var("API_URL").unwrap_or_else(|_| {
            tracing::warn!("API_URL not set; using {}", DEFAULT_API_URL);
            DEFAULT_API_URL.to_string()
        });

        let mut config = Self::new(api_url);
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        config.auth_bypass = std::env::var("AUTH_BYPASS")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        config
    }

    /// Whether the route gate may admit requests with the fixed development
    /// principal. The escape hatch is compiled out of release builds: the
    /// flag is ignored whenever the build-time production indicator is set.
    pub fn auth_bypass_active(&self) -> bool {
        self.auth_bypass && cfg!(debug_assertions)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_accepts_common_spellings() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn bypass_requires_the_flag() {
        let config = GatewayConfig::new("http://backend");
        assert!(!config.auth_bypass_active());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn bypass_is_honored_in_debug_builds() {
        let mut config = GatewayConfig::new("http://backend");
        config.auth_bypass = true;
        assert!(config.auth_bypass_active());
    }
}
