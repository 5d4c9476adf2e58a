use super::ConfigError;

/// Backend resolving `${...}` references found in string config values.
pub trait PlaceholderResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Default resolver.
///
/// - `${VAR_NAME}` / `${env:VAR_NAME}`: environment variable
/// - `${file:/path}`: file contents, trimmed
/// - `${VAR_NAME:fallback}`: environment variable with a literal fallback
pub struct EnvResolver;

impl PlaceholderResolver for EnvResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        let reference = reference.trim();
        if let Some(path) = reference.strip_prefix("file:") {
            return std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("Placeholder file '{}': {e}", path.trim())));
        }
        let var = reference.strip_prefix("env:").unwrap_or(reference);
        match var.split_once(':') {
            Some((name, fallback)) => Ok(std::env::var(name).unwrap_or_else(|_| fallback.to_string())),
            None => std::env::var(var).map_err(|_| ConfigError::NotFound(format!("env:{var}"))),
        }
    }
}

/// Resolve every `${...}` placeholder in `value`.
pub fn resolve_placeholders(
    value: &str,
    resolver: &dyn PlaceholderResolver,
) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let end = rest[start..]
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("Unclosed placeholder in: {value}")))?;
        result.push_str(&rest[..start]);
        result.push_str(&resolver.resolve(&rest[start + 2..start + end])?);
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}
