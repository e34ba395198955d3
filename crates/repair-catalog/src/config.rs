use std::time::Duration;

use repair_common::cms::CmsClientConfig;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub cms: CmsClientConfig,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub http_listen_addr: Option<String>,
    pub mcp_tcp_listen_addr: Option<String>,
}

impl Config {
    /// Required:
    /// - `MICROCMS_SERVICE_DOMAIN`
    /// - `MICROCMS_API_KEY`
    ///
    /// Optional:
    /// - `REDIS_URL`
    /// - `CATALOG_HTTP_LISTEN_ADDR` (serve the JSON API instead of MCP)
    /// - `MCP_TCP_LISTEN_ADDR` (MCP over TCP instead of stdio)
    /// - `CMS_TIMEOUT_SECS` (default: 30)
    /// - `CMS_MAX_RETRIES` (default: 3)
    /// - `CMS_RETRY_INITIAL_MS` (default: 200)
    /// - `CMS_RETRY_MAX_MS` (default: 5000)
    /// - `CMS_CACHE_TTL_SECS` (default: 300)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} environment variable is required")))
        };
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let service_domain = required("MICROCMS_SERVICE_DOMAIN")?;
        let api_key = required("MICROCMS_API_KEY")?;

        let mut cms = CmsClientConfig::for_service(&service_domain, &api_key);
        if let Some(secs) = parsed("CMS_TIMEOUT_SECS") {
            cms.default_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parsed("CMS_MAX_RETRIES") {
            cms.max_retries = retries.min(u32::MAX as u64) as u32;
        }
        if let Some(ms) = parsed("CMS_RETRY_INITIAL_MS") {
            cms.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed("CMS_RETRY_MAX_MS") {
            cms.max_backoff = Duration::from_millis(ms);
        }

        Ok(Self {
            cms,
            redis_url: lookup("REDIS_URL"),
            cache_ttl_secs: parsed("CMS_CACHE_TTL_SECS").unwrap_or(300),
            http_listen_addr: lookup("CATALOG_HTTP_LISTEN_ADDR"),
            mcp_tcp_listen_addr: lookup("MCP_TCP_LISTEN_ADDR"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn requires_cms_credentials() {
        let err = config_from(&[("MICROCMS_SERVICE_DOMAIN", "shop")]).unwrap_err();
        assert!(err.to_string().contains("MICROCMS_API_KEY"));

        let err = config_from(&[("MICROCMS_SERVICE_DOMAIN", " "), ("MICROCMS_API_KEY", "k")])
            .unwrap_err();
        assert!(err.to_string().contains("MICROCMS_SERVICE_DOMAIN"));
    }

    #[test]
    fn applies_defaults_and_overrides() {
        let config = config_from(&[
            ("MICROCMS_SERVICE_DOMAIN", "shop"),
            ("MICROCMS_API_KEY", "k"),
            ("CMS_MAX_RETRIES", "5"),
            ("CMS_TIMEOUT_SECS", "not-a-number"),
        ])
        .unwrap();
        assert_eq!(config.cms.base_url, "https://shop.microcms.io/api/v1");
        assert_eq!(config.cms.max_retries, 5);
        assert_eq!(config.cms.default_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.redis_url.is_none());
        assert!(config.http_listen_addr.is_none());
    }
}
