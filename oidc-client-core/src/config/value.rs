use serde_yaml::Value as Yaml;

use super::ConfigError;

/// A leaf of the flattened configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub(crate) fn from_yaml(node: &Yaml) -> Self {
        match node {
            Yaml::Null => Self::Null,
            Yaml::Bool(flag) => Self::Bool(*flag),
            Yaml::Number(num) => num
                .as_i64()
                .map(Self::Integer)
                .or_else(|| num.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::String(num.to_string())),
            Yaml::String(text) => Self::String(text.clone()),
            Yaml::Sequence(items) => Self::List(items.iter().map(Self::from_yaml).collect()),
            // Maps are reached through their flattened keys.
            Yaml::Mapping(_) | Yaml::Tagged(_) => Self::Null,
        }
    }

    /// The scalar as it would be written in an environment variable.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(text) => Some(text.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Null | Self::List(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Booleans also accept `1`/`0`, `yes`/`no` and `on`/`off` from env overrides.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            Self::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Types readable out of a [`ConfigValue`].
pub trait FromConfigValue: Sized {
    /// Type name used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_value(value: &ConfigValue) -> Option<Self>;
}

/// Convert the value under `key`, reporting a mismatch against `key`.
pub(crate) fn convert<V: FromConfigValue>(value: &ConfigValue, key: &str) -> Result<V, ConfigError> {
    V::from_value(value).ok_or_else(|| ConfigError::TypeMismatch {
        key: key.to_string(),
        expected: V::EXPECTED,
    })
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_text()
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_flag()
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_integer()
    }
}

impl FromConfigValue for u64 {
    const EXPECTED: &'static str = "non-negative integer";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_integer().and_then(|n| u64::try_from(n).ok())
    }
}

impl FromConfigValue for usize {
    const EXPECTED: &'static str = "non-negative integer";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_integer().and_then(|n| usize::try_from(n).ok())
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Lists come from YAML sequences, or from comma-separated env values.
impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::List(items) => items.iter().map(T::from_value).collect(),
            ConfigValue::String(text) => text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| T::from_value(&ConfigValue::String(part.to_string())))
                .collect(),
            ConfigValue::Null => Some(Vec::new()),
            scalar => T::from_value(scalar).map(|v| vec![v]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_strings_convert_to_bool() {
        assert_eq!(ConfigValue::String("YES".into()).as_flag(), Some(true));
        assert_eq!(ConfigValue::String("off".into()).as_flag(), Some(false));
        assert_eq!(ConfigValue::String("maybe".into()).as_flag(), None);
    }

    #[test]
    fn negative_integer_rejected_for_unsigned() {
        let err = convert::<u64>(&ConfigValue::Integer(-4), "oidc.configs.0.token-refresh-in-seconds")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch { expected: "non-negative integer", .. }
        ));
    }

    #[test]
    fn comma_separated_env_value_is_a_list() {
        let scopes: Vec<String> =
            convert(&ConfigValue::String("openid, profile,offline_access".into()), "k").unwrap();
        assert_eq!(scopes, vec!["openid", "profile", "offline_access"]);
    }

    #[test]
    fn null_is_none() {
        let v: Option<String> = convert(&ConfigValue::Null, "k").unwrap();
        assert!(v.is_none());
    }
}
