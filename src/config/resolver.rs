//! Layered configuration resolution
//!
//! Precedence, highest first and per individual field: explicit overrides,
//! `DTB_*` environment variables, the YAML file, built-in defaults.

use super::builder::ConfigOverrides;
use super::loader::{env_layer, load_file_layer, EnvSnapshot};
use super::Config;
use crate::utils::error::Result;
use std::path::Path;
use tracing::{debug, info};

/// Merges the configuration sources into one validated [`Config`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolve the configuration for one run
    ///
    /// `file_path` of `None` means `~/.dt_toolbox/config.yml`, home taken from
    /// `env`. Nothing is read from the process environment here; pass
    /// [`EnvSnapshot::from_process`] for that.
    pub fn resolve(
        file_path: Option<&Path>,
        env: &EnvSnapshot,
        overrides: &ConfigOverrides,
    ) -> Result<Config> {
        let file = load_file_layer(file_path, env)?;
        let environment = env_layer(env)?;

        debug!(
            file_empty = file.is_empty(),
            env_empty = environment.is_empty(),
            "Merging configuration sources"
        );

        let merged = overrides.layer().clone().over(environment.over(file));
        let config = Config::from_layer(merged)?;

        info!(
            app_name = %config.app_name,
            storage = config.storage.enabled,
            "Configuration resolved"
        );
        Ok(config)
    }

    /// Resolve against the live process environment and `.env`
    pub fn resolve_from_process(
        file_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Config> {
        Self::resolve(file_path, &EnvSnapshot::from_process(), overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_precedence_is_per_field() {
        let config_file = file(
            r#"
app_name: from_file
owner: file@example.com
log_level: DEBUG
notification:
  smtp_host: smtp.file.example.com
  smtp_port: 25
"#,
        );
        let env: EnvSnapshot = [
            ("DTB_APP_NAME", "from_env"),
            ("DTB_SMTP_PORT", "2525"),
        ]
        .into_iter()
        .collect();
        let overrides = ConfigOverrides::new().with_app_name("from_args");

        let config = ConfigResolver::resolve(Some(config_file.path()), &env, &overrides).unwrap();

        assert_eq!(config.app_name, "from_args");
        assert_eq!(config.owner, "file@example.com");
        assert_eq!(config.notification.smtp.port, 2525);
        assert_eq!(
            config.notification.smtp.host.as_deref(),
            Some("smtp.file.example.com")
        );
        assert_eq!(config.log_level, crate::config::LogLevel::Debug);
    }

    #[test]
    fn test_missing_default_file_is_not_an_error() {
        let home = tempfile::tempdir().unwrap();
        let env = EnvSnapshot::empty().with_var("HOME", home.path().to_string_lossy());
        let overrides = ConfigOverrides::new()
            .with_app_name("job")
            .with_owner("job@example.com");

        let config = ConfigResolver::resolve(None, &env, &overrides).unwrap();
        assert_eq!(config.app_name, "job");
    }

    #[test]
    fn test_env_errors_surface_before_defaults() {
        let env = EnvSnapshot::empty().with_var("DTB_NOTIFY_ON_SUCCESS", "sometimes");
        let overrides = ConfigOverrides::new()
            .with_app_name("job")
            .with_owner("job@example.com");

        let err = ConfigResolver::resolve(None, &env, &overrides).unwrap_err();
        assert_eq!(err.config_field(), Some("notification.notify_on_success"));
    }
}
