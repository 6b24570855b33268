//! Credential resolution for the mailbox password and model API keys.
//!
//! A credential can be given three ways, checked in this order:
//!
//! 1. **Inline** - `password: "..."` in the config file
//! 2. **File** - `password_file: /run/secrets/imap` (trailing whitespace trimmed)
//! 3. **Environment** - `password_env_var: NOTIA_IMAP_PASSWORD`
//!
//! Empty strings count as "not given".

use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;

/// Error type for credential resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential source configured (need an inline value, a file or an env var)")]
    NoSourceProvided,

    #[error("Failed to read credential file '{path}': {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// The configured places a single credential may come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSource<'a> {
    pub inline: Option<&'a str>,
    pub file: Option<&'a str>,
    pub env_var: Option<&'a str>,
}

impl<'a> SecretSource<'a> {
    pub fn new(inline: Option<&'a str>, file: Option<&'a str>, env_var: Option<&'a str>) -> Self {
        Self {
            inline: non_empty(inline),
            file: non_empty(file),
            env_var: non_empty(env_var),
        }
    }

    /// True when at least one source is set.
    pub fn is_configured(&self) -> bool {
        self.inline.is_some() || self.file.is_some() || self.env_var.is_some()
    }

    /// Resolves the first configured source. A configured source that fails
    /// (missing file, unset variable) is an error; later sources are not tried.
    pub fn resolve(&self) -> Result<SecretString> {
        if let Some(value) = self.inline {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = self.file {
            let path = expand_home(path);
            let content = fs::read_to_string(&path)
                .map_err(|source| SecretError::FileReadError { path, source })?;
            return Ok(SecretString::from(content.trim().to_string()));
        }

        if let Some(name) = self.env_var {
            return match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }

    /// Like [`resolve`](Self::resolve) but an unconfigured source is `Ok(None)`.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>> {
        match self.resolve() {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resolves a credential from inline value, file, or env var, in that order.
pub fn resolve_secret(
    inline: Option<&str>,
    file: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    SecretSource::new(inline, file, env_var).resolve()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Expands a leading `~` or `~/` to the home directory. `~user` is left alone.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return match path.strip_prefix("~/") {
                Some(rest) => home.join(rest),
                None => home,
            };
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_inline_value_wins() {
        let secret = resolve_secret(Some("inline"), Some("/nonexistent"), Some("NOPE")).unwrap();
        assert_eq!(secret.expose_secret(), "inline");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let source = SecretSource::new(Some(""), Some(""), Some(""));
        assert!(!source.is_configured());
        assert!(matches!(source.resolve(), Err(SecretError::NoSourceProvided)));
        assert!(source.resolve_optional().unwrap().is_none());
    }

    #[test]
    fn test_file_value_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let secret = resolve_secret(None, Some(&path), Some("IGNORED")).unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = resolve_secret(None, Some("/nonexistent/notia-secret"), None).unwrap_err();
        assert!(matches!(err, SecretError::FileReadError { .. }));
    }

    #[test]
    #[serial]
    fn test_env_var_source() {
        std::env::set_var("NOTIA_TEST_SECRET", "from-env\n");
        let secret = resolve_secret(None, None, Some("NOTIA_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("NOTIA_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_unset_env_var_is_error() {
        std::env::remove_var("NOTIA_TEST_SECRET_UNSET");
        let err = resolve_secret(None, None, Some("NOTIA_TEST_SECRET_UNSET")).unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { name } if name == "NOTIA_TEST_SECRET_UNSET"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~alice/x"), PathBuf::from("~alice/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x/y"), home.join("x/y"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
