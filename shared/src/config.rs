use crate::TtlMs;
use std::time::Duration;
use tracing::warn;

pub struct Config {
    pub backend_url: String,
    pub backend_api_key: Option<String>,
    pub cache_ttl: TtlMs,
    pub cache_max_entries: Option<u64>,
    pub request_timeout: Duration,
}

impl Config {
    const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";
    const DEFAULT_CACHE_TTL_MS: u64 = 600_000;
    const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("ATRIUM_BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| Self::DEFAULT_BACKEND_URL.to_string());

        let backend_api_key = lookup("ATRIUM_BACKEND_API_KEY").filter(|key| !key.is_empty());
        if backend_api_key.is_none() {
            warn!("ATRIUM_BACKEND_API_KEY not set, backend requests will be anonymous");
        }

        // Negative TTLs disable caching, same as zero.
        let cache_ttl = TtlMs(match lookup("ATRIUM_CACHE_TTL_MS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) => ms.max(0) as u64,
                Err(_) => {
                    warn!("Invalid value '{}' for ATRIUM_CACHE_TTL_MS, using default", raw);
                    Self::DEFAULT_CACHE_TTL_MS
                }
            },
            None => Self::DEFAULT_CACHE_TTL_MS,
        });
        let request_timeout = Duration::from_millis(parse_or(
            &lookup,
            "ATRIUM_REQUEST_TIMEOUT_MS",
            Self::DEFAULT_REQUEST_TIMEOUT_MS,
        ));

        let cache_max_entries = match lookup("ATRIUM_CACHE_MAX_ENTRIES") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    warn!("Ignoring invalid ATRIUM_CACHE_MAX_ENTRIES '{}', cache stays unbounded", raw);
                    None
                }
                Ok(n) => Some(n),
            },
            None => None,
        };

        Self {
            backend_url,
            backend_api_key,
            cache_ttl,
            cache_max_entries,
            request_timeout,
        }
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    match lookup(name) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default {}", raw, name, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.backend_url, "http://localhost:54321");
        assert_eq!(config.backend_api_key, None);
        assert_eq!(config.cache_ttl, TtlMs(600_000));
        assert_eq!(config.cache_max_entries, None);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("ATRIUM_BACKEND_URL", "https://db.example.org/"),
            ("ATRIUM_BACKEND_API_KEY", "anon-key"),
            ("ATRIUM_CACHE_TTL_MS", "0"),
            ("ATRIUM_CACHE_MAX_ENTRIES", "500"),
            ("ATRIUM_REQUEST_TIMEOUT_MS", "2500"),
        ]));
        assert_eq!(config.backend_url, "https://db.example.org");
        assert_eq!(config.backend_api_key.as_deref(), Some("anon-key"));
        assert_eq!(config.cache_ttl, TtlMs::ZERO);
        assert_eq!(config.cache_max_entries, Some(500));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_negative_ttl_disables_caching() {
        let config = Config::from_lookup(lookup_from(&[("ATRIUM_CACHE_TTL_MS", "-5")]));
        assert_eq!(config.cache_ttl, TtlMs::ZERO);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("ATRIUM_CACHE_TTL_MS", "soon"),
            ("ATRIUM_CACHE_MAX_ENTRIES", "lots"),
            ("ATRIUM_REQUEST_TIMEOUT_MS", "-1"),
        ]));
        assert_eq!(config.cache_ttl, TtlMs(600_000));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_max_entries, None);
    }
}
