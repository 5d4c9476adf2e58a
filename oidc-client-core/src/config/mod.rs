mod loader;
pub mod openid;
pub mod placeholders;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use loader::env_key_for;
pub use openid::{validate_configurations, OpenIdConfiguration, DEFAULT_TOKEN_REFRESH_IN_SECONDS};
pub use placeholders::{EnvResolver, PlaceholderResolver};
pub use value::{ConfigValue, FromConfigValue};

/// One problem found while validating the configuration set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationDetail {
    /// Key (or configuration id) the problem is attached to.
    pub key: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    /// A file could not be read or parsed, or a placeholder could not be resolved.
    Load(String),
    Validation(Vec<ConfigValidationDetail>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "missing configuration key '{key}'"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "'{key}' is not a valid {expected}")
            }
            ConfigError::Load(msg) => write!(f, "could not load OIDC configuration: {msg}"),
            ConfigError::Validation(details) => {
                f.write_str("invalid OIDC configuration")?;
                for ConfigValidationDetail { key, message } in details {
                    write!(f, "\n  {key}: {message}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Client configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `{dir}/oidc.yaml`
/// 2. `{dir}/oidc-{profile}.yaml`
/// 3. `.env` and `.env.{profile}` (loaded into the process environment, never
///    overwriting variables that are already set)
/// 4. `OIDC_*` environment variables (`OIDC_CONFIGS_0_AUTHORITY` overrides
///    `oidc.configs.0.authority`)
///
/// The profile is `OIDC_PROFILE` if set, otherwise the argument.
///
/// ```yaml
/// oidc:
///   configs:
///     - config-id: main
///       authority: https://idp.example.com/realms/main
///       client-id: spa
///       silent-renew: true
///       silent-renew-url: https://app.example.com/silent-renew.html
/// ```
#[derive(Debug, Clone)]
pub struct OidcClientConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl OidcClientConfig {
    /// Load from the current working directory with the default resolver.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."), profile, &EnvResolver)
    }

    /// Load from `dir`, resolving `${...}` placeholders with `resolver`.
    pub fn load_from_dir(
        dir: &Path,
        profile: &str,
        resolver: &dyn PlaceholderResolver,
    ) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("OIDC_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        for file in ["oidc.yaml".to_string(), format!("oidc-{active_profile}.yaml")] {
            loader::merge_yaml_file(&mut values, &dir.join(file))?;
        }

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        expand_placeholders(&mut values, resolver)?;
        loader::overlay_env(&mut values, std::env::vars());

        tracing::debug!(profile = %active_profile, keys = values.len(), "OIDC client configuration loaded");

        Ok(Self {
            values,
            profile: active_profile,
        })
    }

    /// Parse `yaml` alone; no files, no environment.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::merge_yaml_str(&mut values, yaml)?;
        Ok(Self {
            values,
            profile: profile.to_owned(),
        })
    }

    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            profile: String::from("default"),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }

    /// Typed value under the dotted `key`.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => value::convert(value, key),
            None => Err(ConfigError::NotFound(key.to_owned())),
        }
    }

    /// Like [`get`](Self::get), but a missing or null key is `Ok(None)`.
    pub fn get_opt<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        self.values
            .get(key)
            .filter(|value| !matches!(value, ConfigValue::Null))
            .map(|value| value::convert(value, key))
            .transpose()
    }

    /// Like [`get`](Self::get), falling back to `default` on any error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build and validate the configuration set under `oidc.configs`.
    ///
    /// An absent section yields an empty set; callers decide whether that is
    /// acceptable.
    pub fn configurations(&self) -> Result<Vec<OpenIdConfiguration>, ConfigError> {
        let mut configs = Vec::new();
        while self.has_config_at(configs.len()) {
            configs.push(OpenIdConfiguration::from_config(self, configs.len())?);
        }
        validate_configurations(&configs)?;
        Ok(configs)
    }

    fn has_config_at(&self, index: usize) -> bool {
        let prefix = format!("oidc.configs.{index}.");
        self.values.keys().any(|k| k.starts_with(&prefix))
    }
}

fn expand_placeholders(
    values: &mut HashMap<String, ConfigValue>,
    resolver: &dyn PlaceholderResolver,
) -> Result<(), ConfigError> {
    let templated = values.values_mut().filter_map(|value| match value {
        ConfigValue::String(text) if text.contains("${") => Some(text),
        _ => None,
    });
    for text in templated {
        *text = placeholders::resolve_placeholders(text, resolver)?;
    }
    Ok(())
}
