use std::path::{Path, PathBuf};

use crate::config::schema::{Config, ModelBackend};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "NOTIA_CONFIG";

/// Config file location: `$NOTIA_CONFIG`, else `~/.notia/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|h| h.join(".notia").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Writes a config file, creating parent directories.
pub fn write_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let write_err = |e: std::io::Error| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json + "\n").map_err(write_err)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if let Some(mailbox) = &config.mailbox {
        if mailbox.batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "mailbox.batch_size must be at least 1".to_string(),
            });
        }
        if mailbox.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                message: "mailbox.timeout_secs must be at least 1".to_string(),
            });
        }
    }

    if config.server.port == 0 {
        return Err(ConfigError::Validation {
            message: "server.port must not be 0".to_string(),
        });
    }

    let model = &config.model;
    match model.backend {
        ModelBackend::Keyword => {}
        ModelBackend::Llama => {
            if model.model_path.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Validation {
                    message: "model.model_path is required for the llama backend".to_string(),
                });
            }
        }
        ModelBackend::Openai => {
            if model.endpoint.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Validation {
                    message: "model.endpoint is required for the openai backend".to_string(),
                });
            }
            if model.model_name.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Validation {
                    message: "model.model_name is required for the openai backend".to_string(),
                });
            }
        }
    }

    Ok(())
}
