//! API configuration: read from the environment exactly once at startup
//! (optionally seeded from a dotenv file), validated, then threaded by value
//! into the submitter and adapters.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::utils::error::ConfigError;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_RATE_LIMIT_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub workers: usize,
    pub rate_limit: Duration,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            None => {
                // A missing .env is fine; variables may be set directly.
                let _ = dotenvy::dotenv();
            }
        }

        let api_url = required("BULKPOST_API_URL")?;
        validate_url(&api_url)?;

        let workers: usize = parsed("BULKPOST_WORKERS", DEFAULT_WORKERS)?;
        if workers == 0 {
            return Err(ConfigError::InvalidVar {
                name: "BULKPOST_WORKERS",
                reason: "must be at least 1".to_string(),
            });
        }
        let rate_limit_ms: u64 = parsed("BULKPOST_RATE_LIMIT_MS", DEFAULT_RATE_LIMIT_MS)?;
        let timeout_secs: u64 = parsed("BULKPOST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            api_url,
            client_id: required("BULKPOST_CLIENT_ID")?,
            client_secret: required("BULKPOST_CLIENT_SECRET")?,
            workers,
            rate_limit: Duration::from_millis(rate_limit_ms),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map_err(|_| ConfigError::InvalidVar {
            name,
            reason: format!("cannot parse '{}'", value.trim()),
        }),
        Err(_) => Ok(default),
    }
}

fn validate_url(raw: &str) -> Result<(), ConfigError> {
    match Url::parse(raw) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            }),
        },
        Err(e) => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_schemes_only() {
        assert!(validate_url("https://api.example.test/v1/businesses").is_ok());
        assert!(validate_url("http://localhost:8080/submit").is_ok());
        assert!(validate_url("ftp://example.test").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
