//! Configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first, if present. Every
//! variable is optional:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `STRATA_ADDR` | `0.0.0.0:3000` | listen address |
//! | `STRATA_CACHE_MAX_AGE` | `3600` | `max-age` seconds; empty disables it |
//! | `STRATA_CACHE_PUBLIC` | `true` | emit `public` |
//! | `STRATA_CACHE_NO_CACHE` | `false` | emit `no-cache` |
//! | `STRATA_CACHE_NO_STORE` | `false` | emit `no-store` |
//! | `STRATA_COMPRESSION_MIN_SIZE` | `0` | smallest body worth gzipping, in bytes |

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use tracing::debug;

use crate::error::Error;
use crate::handler::Endpoint;
use crate::middleware::{CacheControl, CachePolicy, Compression, Logger, SecurityHeaders, Timing};
use crate::pipeline::Pipeline;

/// Process configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub cache: CachePolicy,
    pub compression_min_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cache: CachePolicy::default(),
            compression_min_size: 0,
        }
    }
}

impl Config {
    /// Reads `.env` (if any), then the process environment.
    pub fn from_env() -> Result<Self, Error> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => debug!(error = %e, "ignoring unreadable .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self::default();
        let max_age = match lookup("STRATA_CACHE_MAX_AGE") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(parse("STRATA_CACHE_MAX_AGE", &raw)?),
            None => defaults.cache.max_age,
        };

        Ok(Self {
            addr: parse_or(&lookup, "STRATA_ADDR", defaults.addr)?,
            cache: CachePolicy {
                max_age,
                public: flag_or(&lookup, "STRATA_CACHE_PUBLIC", defaults.cache.public)?,
                no_cache: flag_or(&lookup, "STRATA_CACHE_NO_CACHE", defaults.cache.no_cache)?,
                no_store: flag_or(&lookup, "STRATA_CACHE_NO_STORE", defaults.cache.no_store)?,
            },
            compression_min_size: parse_or(
                &lookup,
                "STRATA_COMPRESSION_MIN_SIZE",
                defaults.compression_min_size,
            )?,
        })
    }

    /// The standard chain around `endpoint`, outermost first: logger,
    /// security headers, timing, compression, cache control.
    pub fn pipeline(&self, endpoint: impl Endpoint) -> Pipeline {
        Pipeline::builder()
            .layer(Logger::new())
            .layer(SecurityHeaders::new())
            .layer(Timing::new())
            .layer(Compression::new().min_size(self.compression_min_size))
            .layer(CacheControl::new(self.cache.clone()))
            .endpoint(endpoint)
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, Error> {
    raw.trim().parse().map_err(|_| Error::Config { key, value: raw.to_owned() })
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, Error> {
    lookup(key).map_or(Ok(default), |raw| parse(key, &raw))
}

fn flag_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, Error> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::router::Router;

    fn from(pairs: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.header_value(), "max-age=3600, public");
    }

    #[test]
    fn reads_every_option() {
        let config = from(&[
            ("STRATA_ADDR", "127.0.0.1:8080"),
            ("STRATA_CACHE_MAX_AGE", "60"),
            ("STRATA_CACHE_PUBLIC", "no"),
            ("STRATA_CACHE_NO_CACHE", "TRUE"),
            ("STRATA_CACHE_NO_STORE", "1"),
            ("STRATA_COMPRESSION_MIN_SIZE", "1024"),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.cache.header_value(), "max-age=60, no-cache, no-store");
        assert_eq!(config.compression_min_size, 1024);
    }

    #[test]
    fn empty_max_age_disables_it() {
        let config = from(&[("STRATA_CACHE_MAX_AGE", "")]).unwrap();
        assert_eq!(config.cache.max_age, None);
        assert_eq!(config.cache.header_value(), "public");
    }

    #[test]
    fn rejects_bad_values() {
        let err = from(&[("STRATA_CACHE_MAX_AGE", "an hour")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value `an hour` for STRATA_CACHE_MAX_AGE");

        assert!(matches!(
            from(&[("STRATA_CACHE_PUBLIC", "maybe")]),
            Err(Error::Config { key: "STRATA_CACHE_PUBLIC", .. }),
        ));
        assert!(matches!(
            from(&[("STRATA_ADDR", "localhost")]),
            Err(Error::Config { key: "STRATA_ADDR", .. }),
        ));
    }

    #[test]
    fn standard_pipeline_order() {
        let pipeline = Config::default().pipeline(Router::new());
        assert_eq!(
            pipeline.layer_names(),
            ["logger", "security-headers", "timing", "compression", "cache-control"],
        );
    }
}
