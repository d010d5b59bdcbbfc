use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub path: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("JSONRPC_PATH must start with '/'")]
    InvalidPath,
    #[error("JSONRPC_MAX_BODY_BYTES must be a positive integer")]
    InvalidMaxBodyBytes,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8000);
        let path = env::var("JSONRPC_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "/".to_string());
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath);
        }
        let max_body_bytes = env::var("JSONRPC_MAX_BODY_BYTES")
            .ok()
            .map(|value| {
                value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or(ConfigError::InvalidMaxBodyBytes)
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let config = Self {
            bind_addr,
            bind_port,
            path,
            max_body_bytes,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Environment variables are process-wide; serialize the tests touching them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("BIND_ADDR");
        env::remove_var("BIND_PORT");
        env::remove_var("JSONRPC_PATH");
        env::remove_var("JSONRPC_MAX_BODY_BYTES");
    }

    #[test]
    fn parse_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        clear_env();

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8000);
        assert_eq!(config.path, "/");
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn invalid_port_fails() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        clear_env();
        env::set_var("BIND_PORT", "99999");

        let err = Config::from_env().expect_err("expected invalid port error");
        assert!(matches!(err, ConfigError::InvalidPort));
        clear_env();
    }

    #[test]
    fn path_must_be_absolute() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        clear_env();
        env::set_var("JSONRPC_PATH", "rpc");

        let err = Config::from_env().expect_err("expected invalid path error");
        assert!(matches!(err, ConfigError::InvalidPath));
        clear_env();
    }

    #[test]
    fn zero_body_limit_fails() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        clear_env();
        env::set_var("JSONRPC_MAX_BODY_BYTES", "0");

        let err = Config::from_env().expect_err("expected invalid limit error");
        assert!(matches!(err, ConfigError::InvalidMaxBodyBytes));
        clear_env();
    }

    #[test]
    fn custom_values_parse() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        clear_env();
        env::set_var("BIND_ADDR", "0.0.0.0");
        env::set_var("BIND_PORT", "9100");
        env::set_var("JSONRPC_PATH", "/rpc");
        env::set_var("JSONRPC_MAX_BODY_BYTES", "4096");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(
            config.bind_socket().expect("socket"),
            "0.0.0.0:9100".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(config.path, "/rpc");
        assert_eq!(config.max_body_bytes, 4096);
        clear_env();
    }
}
