//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, message } => write!(f, "Invalid {}: {}", key, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply process environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to resolve variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = lookup("GATEWAY_TARGET_ORIGIN") {
        config.upstream.target_origin = origin;
    }

    if let Some(secret) = lookup("GATEWAY_SHARED_SECRET") {
        config.security.shared_secret = Some(secret);
    }

    if let Some(addr) = lookup("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }

    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            message: format!("'{}' is not a port number", port),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(env) = lookup("GATEWAY_ENV") {
        config.security.environment = env
            .parse()
            .map_err(|message| ConfigError::Env { key: "GATEWAY_ENV", message })?;
    }

    if let Some(mode) = lookup("GATEWAY_MODE") {
        config.proxy.mode = mode
            .parse()
            .map_err(|message| ConfigError::Env { key: "GATEWAY_MODE", message })?;
    }

    Ok(())
}
