// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and is
//! immutable afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Auth0 tenant domain (issuer and JWKS host) | Required |
//! | `API_AUDIENCE` | Expected JWT audience claim | Required |
//! | `ALGORITHMS` | Comma-separated accepted signing algorithms | `RS256` |
//! | `JWT_LEEWAY_SECS` | Clock skew tolerated on `exp`/`nbf` | `0` |
//! | `JWKS_CACHE_TTL_SECS` | Signing key cache lifetime | `600` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Timeout for one JWKS fetch | `10` |
//! | `JWKS_REFRESH_INTERVAL_SECS` | Background key refresh period (`0` disables) | `300` |
//! | `DATABASE_PATH` | redb database file | `data/drinks.redb` |
//! | `RESET_DATABASE` | Drop all drinks and seed the default menu on start | `false` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both are set | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const API_AUDIENCE_ENV: &str = "API_AUDIENCE";
pub const ALGORITHMS_ENV: &str = "ALGORITHMS";
pub const JWT_LEEWAY_ENV: &str = "JWT_LEEWAY_SECS";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const JWKS_REFRESH_INTERVAL_ENV: &str = "JWKS_REFRESH_INTERVAL_SECS";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const RESET_DATABASE_ENV: &str = "RESET_DATABASE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_DATABASE_PATH: &str = "data/drinks.redb";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWT_LEEWAY_SECS: u64 = 0;
const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_JWKS_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_JWKS_REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Certificate and key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Expected issuer, `https://<domain>/`
    pub issuer: Url,
    /// `https://<domain>/.well-known/jwks.json`
    pub jwks_url: Url,
    pub audience: String,
    pub algorithms: Vec<Algorithm>,
    /// Seconds of clock skew tolerated on `exp` and `nbf`
    pub leeway: u64,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    /// `None` disables the background refresher
    pub jwks_refresh_interval: Option<Duration>,
    pub database_path: PathBuf,
    pub reset_database: bool,
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let domain = get(AUTH0_DOMAIN_ENV).ok_or(ConfigError::Missing(AUTH0_DOMAIN_ENV))?;
        let issuer = issuer_url(&domain)?;
        let jwks_url = issuer
            .join(".well-known/jwks.json")
            .map_err(|e| invalid(AUTH0_DOMAIN_ENV, e.to_string()))?;

        let audience = get(API_AUDIENCE_ENV).ok_or(ConfigError::Missing(API_AUDIENCE_ENV))?;

        let algorithms = match get(ALGORITHMS_ENV) {
            Some(list) => parse_algorithms(&list)?,
            None => vec![Algorithm::RS256],
        };

        let secs = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(name) {
                Some(value) => value
                    .parse()
                    .map_err(|_| invalid(name, format!("expected seconds, got {value:?}"))),
                None => Ok(default),
            }
        };

        let leeway = secs(JWT_LEEWAY_ENV, DEFAULT_JWT_LEEWAY_SECS)?;
        let jwks_cache_ttl =
            Duration::from_secs(secs(JWKS_CACHE_TTL_ENV, DEFAULT_JWKS_CACHE_TTL_SECS)?);
        let jwks_fetch_timeout = match secs(JWKS_FETCH_TIMEOUT_ENV, DEFAULT_JWKS_FETCH_TIMEOUT_SECS)? {
            0 => return Err(invalid(JWKS_FETCH_TIMEOUT_ENV, "timeout must be positive")),
            n => Duration::from_secs(n),
        };
        let jwks_refresh_interval =
            match secs(JWKS_REFRESH_INTERVAL_ENV, DEFAULT_JWKS_REFRESH_INTERVAL_SECS)? {
                0 => None,
                n => Some(Duration::from_secs(n)),
            };

        let reset_database = match get(RESET_DATABASE_ENV) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                invalid(RESET_DATABASE_ENV, format!("expected true/false, got {value:?}"))
            })?,
            None => false,
        };

        let port = match get(PORT_ENV) {
            Some(value) => value
                .parse()
                .map_err(|_| invalid(PORT_ENV, format!("expected a port number, got {value:?}")))?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(LOG_FORMAT_ENV, format!("expected json or pretty, got {other:?}")))
            }
        };

        Ok(Self {
            issuer,
            jwks_url,
            audience,
            algorithms,
            leeway,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwks_refresh_interval,
            database_path: get(DATABASE_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                .into(),
            reset_database,
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            tls,
            log_format,
        })
    }

    /// Parse the bind address.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| invalid(HOST_ENV, format!("cannot bind to {}:{}", self.host, self.port)))
    }
}

/// Build `https://<domain>/` from a bare domain or a URL.
fn issuer_url(domain: &str) -> Result<Url, ConfigError> {
    let host = domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    let url = Url::parse(&format!("https://{host}/"))
        .map_err(|e| invalid(AUTH0_DOMAIN_ENV, e.to_string()))?;

    if url.path() != "/" || url.query().is_some() {
        return Err(invalid(AUTH0_DOMAIN_ENV, "expected a bare domain"));
    }
    Ok(url)
}

fn parse_algorithms(list: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let algorithm = Algorithm::from_str(name)
            .map_err(|_| invalid(ALGORITHMS_ENV, format!("unknown algorithm {name:?}")))?;
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => algorithms.push(algorithm),
            _ => {
                return Err(invalid(
                    ALGORITHMS_ENV,
                    format!("{name} is not an RSA signing algorithm"),
                ))
            }
        }
    }

    if algorithms.is_empty() {
        return Err(invalid(ALGORITHMS_ENV, "no algorithms listed"));
    }
    Ok(algorithms)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
