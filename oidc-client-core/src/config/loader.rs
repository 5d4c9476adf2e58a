use std::collections::HashMap;
use std::path::Path;

use serde_yaml::Value as Yaml;

use super::value::ConfigValue;
use super::ConfigError;

/// Prefix of environment variables considered for the overlay.
pub(crate) const ENV_PREFIX: &str = "OIDC_";

/// Merge the YAML document at `path` into `values`. Profiles are optional, so
/// a missing file merges nothing.
pub(crate) fn merge_yaml_file(
    values: &mut HashMap<String, ConfigValue>,
    path: &Path,
) -> Result<(), ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => merge_yaml_str(values, &content)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Load(format!("{}: {e}", path.display()))),
    }
}

pub(crate) fn merge_yaml_str(
    values: &mut HashMap<String, ConfigValue>,
    content: &str,
) -> Result<(), ConfigError> {
    let document: Yaml = serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    let mut path = Vec::new();
    flatten_into(values, &mut path, &document);
    Ok(())
}

/// Flatten `node` under the dotted `path`.
///
/// Sequences are kept whole under their own key and also spread into
/// `key.0`, `key.1`, ... so a list of provider maps becomes
/// `oidc.configs.0.authority`, `oidc.configs.1.authority`, ...
fn flatten_into(out: &mut HashMap<String, ConfigValue>, path: &mut Vec<String>, node: &Yaml) {
    match node {
        Yaml::Mapping(map) => {
            for (name, child) in map {
                let segment = match name {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => continue,
                };
                path.push(segment);
                flatten_into(out, path, child);
                path.pop();
            }
        }
        Yaml::Sequence(items) if !path.is_empty() => {
            out.insert(path.join("."), ConfigValue::from_yaml(node));
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                flatten_into(out, path, item);
                path.pop();
            }
        }
        leaf if !path.is_empty() => {
            out.insert(path.join("."), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// Environment variable name for a config key:
/// `oidc.configs.0.client-id` <-> `OIDC_CONFIGS_0_CLIENT_ID`.
pub fn env_key_for(config_key: &str) -> String {
    config_key.to_uppercase().replace(['.', '-'], "_")
}

/// Overlay `OIDC_*` environment variables onto the loaded values.
///
/// A variable that normalizes to an already-loaded key overrides that key
/// (so kebab-case YAML keys stay addressable); anything else is inserted
/// under its lowercased, dot-separated form.
pub(crate) fn overlay_env<I>(values: &mut HashMap<String, ConfigValue>, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let known: HashMap<String, String> = values
        .keys()
        .map(|k| (env_key_for(k), k.clone()))
        .collect();

    for (env_key, env_val) in vars {
        if !env_key.starts_with(ENV_PREFIX) {
            continue;
        }
        let config_key = known
            .get(&env_key)
            .cloned()
            .unwrap_or_else(|| env_key.to_lowercase().replace('_', "."));
        tracing::trace!(env = %env_key, key = %config_key, "Config value overridden from environment");
        values.insert(config_key, ConfigValue::String(env_val));
    }
}
