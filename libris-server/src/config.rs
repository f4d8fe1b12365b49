//! Server configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable                | Field            | Default          |
//! |-------------------------|------------------|------------------|
//! | `LIBRIS_BIND_ADDR`      | `bind_addr`      | `127.0.0.1:8080` |
//! | `LIBRIS_MAX_BODY_BYTES` | `max_body_bytes` | `65536`          |

use thiserror::Error;

pub const BIND_ADDR_ENV: &str = "LIBRIS_BIND_ADDR";
pub const MAX_BODY_BYTES_ENV: &str = "LIBRIS_MAX_BODY_BYTES";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `LIBRIS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            let addr = addr.trim();
            if addr.is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: BIND_ADDR_ENV,
                    value: addr.to_string(),
                    reason: "address is empty".to_string(),
                });
            }
            config.bind_addr = addr.to_string();
        }

        if let Some(raw) = lookup(MAX_BODY_BYTES_ENV) {
            let invalid = |reason: String| ConfigError::InvalidValue {
                name: MAX_BODY_BYTES_ENV,
                value: raw.clone(),
                reason,
            };
            let bytes: usize = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            if bytes == 0 {
                return Err(invalid("must be greater than zero".to_string()));
            }
            config.max_body_bytes = bytes;
        }

        Ok(config)
    }

    /// Config bound to an ephemeral localhost port.
    pub fn for_testing() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            ..Self::default()
        }
    }
}
