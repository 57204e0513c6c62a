//! Configuration sources
//!
//! Loads the YAML file layer and the `DTB_*` environment layer. Both return a
//! [`ConfigLayer`]; merging and defaults happen in the resolver.

use super::layer::{ConfigLayer, NotificationLayer, RedactionLayer, StorageLayer};
use crate::utils::error::{Result, ToolboxError};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Prefix shared by every environment variable the toolbox reads
pub const ENV_PREFIX: &str = "DTB_";

/// Location of the default config file, relative to the home directory
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".dt_toolbox/config.yml";

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("environment reference pattern is valid")
});

/// Immutable view of the environment used for one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Empty snapshot, nothing set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the process environment on top of a `.env` file in the working directory
    ///
    /// The process environment wins over `.env` entries and the process is never
    /// modified.
    pub fn from_process() -> Self {
        let mut vars = HashMap::new();

        match dotenvy::dotenv_iter() {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok((key, value)) => {
                            vars.insert(key, value);
                        }
                        Err(e) => warn!("Skipping unreadable .env entry: {}", e),
                    }
                }
            }
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Failed to read .env file: {}", e),
        }

        vars.extend(std::env::vars());
        Self { vars }
    }

    /// Set one variable, returning the updated snapshot
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up a variable; empty values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Home directory taken from `HOME`, else `USERPROFILE`
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get("HOME")
            .or_else(|| self.get("USERPROFILE"))
            .map(PathBuf::from)
    }

    /// Default config file path, if a home directory is known
    pub fn default_config_path(&self) -> Option<PathBuf> {
        self.home_dir()
            .map(|home| home.join(DEFAULT_CONFIG_RELATIVE_PATH))
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Replace `${VAR}` and `$VAR` references with values from `env`
///
/// Unknown variables are left verbatim.
pub fn expand_env_vars(input: &str, env: &EnvSnapshot) -> String {
    ENV_REFERENCE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Load the YAML file layer
///
/// `path` of `None` means the default location under the home directory. A
/// missing file is an empty layer; an unreadable or malformed one is an error.
pub fn load_file_layer(path: Option<&Path>, env: &EnvSnapshot) -> Result<ConfigLayer> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match env.default_config_path() {
            Some(path) => path,
            None => {
                debug!("No home directory known, skipping default config file");
                return Ok(ConfigLayer::default());
            }
        },
    };

    if !path.exists() {
        debug!("Config file {} not found, using other sources", path.display());
        return Ok(ConfigLayer::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ToolboxError::config(
            "config_file",
            format!("failed to read {}: {}", path.display(), e),
        )
    })?;

    let layer = parse_file_layer(&content, env).map_err(|e| match e {
        ToolboxError::Config { field, message } => ToolboxError::Config {
            field,
            message: format!("{} ({})", message, path.display()),
        },
        other => other,
    })?;

    debug!("Loaded configuration from file: {}", path.display());
    Ok(layer)
}

/// Parse YAML text into a layer, then interpolate environment references
///
/// References are expanded inside string scalars only, after parsing, so a
/// value containing YAML syntax (`#`, `: `, a leading `*` or `@`) stays a
/// literal string.
pub fn parse_file_layer(content: &str, env: &EnvSnapshot) -> Result<ConfigLayer> {
    if content.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }

    let mut document: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| ToolboxError::config("config_file", format!("invalid YAML: {}", e)))?;
    if document.is_null() {
        return Ok(ConfigLayer::default());
    }

    expand_yaml_strings(&mut document, env);
    serde_yaml::from_value(document)
        .map_err(|e| ToolboxError::config("config_file", format!("invalid config: {}", e)))
}

fn expand_yaml_strings(value: &mut serde_yaml::Value, env: &EnvSnapshot) {
    match value {
        serde_yaml::Value::String(text) => {
            if ENV_REFERENCE.is_match(text) {
                *text = expand_env_vars(text, env);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                expand_yaml_strings(item, env);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for item in map.values_mut() {
                expand_yaml_strings(item, env);
            }
        }
        serde_yaml::Value::Tagged(tagged) => expand_yaml_strings(&mut tagged.value, env),
        _ => {}
    }
}

/// Build the environment layer from `DTB_*` variables
pub fn env_layer(env: &EnvSnapshot) -> Result<ConfigLayer> {
    let var = |name: &str| env.get(&format!("{}{}", ENV_PREFIX, name)).map(str::to_string);

    let layer = ConfigLayer {
        app_name: var("APP_NAME"),
        owner: var("OWNER"),
        tags: var("TAGS").map(|v| split_list(&v)),
        log_dir: var("LOG_DIR").map(PathBuf::from),
        log_level: var("LOG_LEVEL"),
        log_rotation: var("LOG_ROTATION"),
        console: parse_bool(env, "CONSOLE", "console")?,
        capture_tracing: parse_bool(env, "CAPTURE_TRACING", "capture_tracing")?,
        notification: NotificationLayer {
            enabled: parse_bool(env, "NOTIFICATIONS_ENABLED", "notification.enabled")?,
            notify_on_success: parse_bool(
                env,
                "NOTIFY_ON_SUCCESS",
                "notification.notify_on_success",
            )?,
            recipients: var("RECIPIENTS").map(|v| split_list(&v)),
            smtp_host: var("SMTP_HOST"),
            smtp_port: parse_number(env, "SMTP_PORT", "notification.smtp_port")?,
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM"),
            smtp_use_tls: parse_bool(env, "SMTP_USE_TLS", "notification.smtp_use_tls")?,
            webhook_url: var("WEBHOOK_URL"),
            webhook_type: var("WEBHOOK_TYPE"),
            webhook_include_stacktrace: parse_bool(
                env,
                "WEBHOOK_INCLUDE_STACKTRACE",
                "notification.webhook_include_stacktrace",
            )?,
            timeout_secs: parse_number(
                env,
                "NOTIFICATION_TIMEOUT_SECS",
                "notification.timeout_secs",
            )?,
        },
        storage: StorageLayer {
            enabled: parse_bool(env, "STORAGE_ENABLED", "storage.enabled")?,
            backend: var("STORAGE_BACKEND"),
            bucket_name: var("STORAGE_BUCKET"),
            prefix: var("STORAGE_PREFIX"),
            upload_threshold_kb: parse_number(
                env,
                "UPLOAD_THRESHOLD_KB",
                "storage.upload_threshold_kb",
            )?,
            aws_access_key_id: var("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            aws_region: var("AWS_REGION"),
            minio_endpoint: var("MINIO_ENDPOINT"),
            minio_access_key: var("MINIO_ACCESS_KEY"),
            minio_secret_key: var("MINIO_SECRET_KEY"),
            local_path: var("STORAGE_LOCAL_PATH").map(PathBuf::from),
            timeout_secs: parse_number(env, "STORAGE_TIMEOUT_SECS", "storage.timeout_secs")?,
        },
        redaction: RedactionLayer {
            enabled: parse_bool(env, "REDACTION_ENABLED", "redaction.enabled")?,
            patterns: None,
            replacement: var("REDACTION_REPLACEMENT"),
        },
    };

    if !layer.is_empty() {
        debug!("Loaded configuration from {}* environment variables", ENV_PREFIX);
    }
    Ok(layer)
}

/// Split a comma-separated list, dropping blank entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean the way shell users write them
pub fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool(env: &EnvSnapshot, name: &str, field: &str) -> Result<Option<bool>> {
    let key = format!("{}{}", ENV_PREFIX, name);
    match env.get(&key) {
        None => Ok(None),
        Some(raw) => parse_bool_value(raw).map(Some).ok_or_else(|| {
            ToolboxError::config(
                field,
                format!("{}='{}' is not a boolean (true/false/1/0/yes/no)", key, raw),
            )
        }),
    }
}

fn parse_number<T>(env: &EnvSnapshot, name: &str, field: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    match env.get(&key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            ToolboxError::config(field, format!("{}='{}' is not a valid number: {}", key, raw, e))
        }),
    }
}
