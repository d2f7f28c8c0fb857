//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

use socialgraph::DEFAULT_PAGE_LIMIT;

/// Errors produced when an environment variable is present but malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Log line format selected by `SGRAPH_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Runtime configuration for a socialgraph server.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a server can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SGRAPH_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `SGRAPH_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `SGRAPH_DEFAULT_PAGE_LIMIT` | `10` | `limit` used when a listing omits it |
/// | `SGRAPH_MAX_PAGE_LIMIT` | `100` | Upper bound applied to `limit` |
/// | `SGRAPH_SIGNATURE_SKEW_SECS` | `300` | Allowed distance between `Date` and server clock |
/// | `SGRAPH_REQUEST_TIMEOUT_SECS` | `30` | Per-request timeout |
/// | `SGRAPH_LOG_FORMAT` | `text` | `text` or `json` |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub default_page_limit: u32,
    pub max_page_limit: u32,

    /// Maximum allowed difference, in seconds, between a signed request's
    /// `Date` header and the server clock.
    pub signature_skew_secs: i64,

    pub request_timeout_secs: u64,

    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: 100,
            signature_skew_secs: 300,
            request_timeout_secs: 30,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Populate config from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = parse_or(&get, "SGRAPH_BIND", "a socket address", defaults.bind_addr)?;
        let default_page_limit = parse_or(
            &get,
            "SGRAPH_DEFAULT_PAGE_LIMIT",
            "a positive integer",
            defaults.default_page_limit,
        )?;
        let max_page_limit = parse_or(
            &get,
            "SGRAPH_MAX_PAGE_LIMIT",
            "a positive integer",
            defaults.max_page_limit,
        )?;
        let signature_skew_secs = parse_or(
            &get,
            "SGRAPH_SIGNATURE_SKEW_SECS",
            "a non-negative number of seconds",
            defaults.signature_skew_secs,
        )?;
        let request_timeout_secs = parse_or(
            &get,
            "SGRAPH_REQUEST_TIMEOUT_SECS",
            "a positive number of seconds",
            defaults.request_timeout_secs,
        )?;

        let log_format = match get("SGRAPH_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SGRAPH_LOG_FORMAT",
                    expected: "\"text\" or \"json\"",
                    value: other.to_string(),
                })
            }
        };

        check("SGRAPH_DEFAULT_PAGE_LIMIT", "a positive integer", default_page_limit, |v| v > 0)?;
        check("SGRAPH_MAX_PAGE_LIMIT", "a positive integer", max_page_limit, |v| v > 0)?;
        check(
            "SGRAPH_SIGNATURE_SKEW_SECS",
            "a non-negative number of seconds",
            signature_skew_secs,
            |v| v >= 0,
        )?;
        check(
            "SGRAPH_REQUEST_TIMEOUT_SECS",
            "a positive number of seconds",
            request_timeout_secs,
            |v| v > 0,
        )?;

        Ok(Self {
            bind_addr,
            db_path: get("SGRAPH_DB").filter(|p| !p.is_empty()),
            default_page_limit: default_page_limit.min(max_page_limit),
            max_page_limit,
            signature_skew_secs,
            request_timeout_secs,
            log_format,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}

fn check<T: Copy + ToString>(
    var: &'static str,
    expected: &'static str,
    value: T,
    ok: impl Fn(T) -> bool,
) -> Result<(), ConfigError> {
    if ok(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            var,
            expected,
            value: value.to_string(),
        })
    }
}
