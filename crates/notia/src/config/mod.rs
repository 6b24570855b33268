pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_config, load_config_from_str, write_config, CONFIG_ENV_VAR,
};
pub use schema::{Config, MailboxConfig, ModelBackend, ModelConfig, ServerConfig};
