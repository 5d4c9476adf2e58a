use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigValidationDetail, OidcClientConfig};

/// Default interval of the periodic token check, in seconds.
pub const DEFAULT_TOKEN_REFRESH_IN_SECONDS: u64 = 4;

/// One OIDC client setup.
///
/// A configuration is immutable for the duration of an authentication check;
/// it is cloned into long-running tasks rather than shared mutably.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenIdConfiguration {
    /// Unique id of this configuration inside a configuration set.
    pub config_id: String,
    /// Issuer URL of the identity provider.
    pub authority: String,
    pub client_id: Option<String>,
    /// Redirect URL registered for this client. Used as the check URL for
    /// configurations that did not initiate the current callback.
    pub redirect_url: Option<String>,
    pub post_logout_redirect_uri: Option<String>,
    pub scope: String,
    pub response_type: String,
    pub silent_renew: bool,
    pub silent_renew_url: Option<String>,
    pub use_refresh_token: bool,
    pub start_check_session: bool,
    /// Interval of the periodic token validation, in seconds.
    pub token_refresh_in_seconds: u64,
    /// Tokens are treated as expired this many seconds before their real expiry.
    pub renew_time_before_token_expires_in_seconds: u64,
    pub trigger_refresh_when_id_token_expired: bool,
    pub disable_id_token_validation: bool,
    pub post_login_route: Option<String>,
}

impl OpenIdConfiguration {
    /// Create a configuration with defaults for every tuning field.
    pub fn new(config_id: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            config_id: config_id.into(),
            authority: authority.into(),
            client_id: None,
            redirect_url: None,
            post_logout_redirect_uri: None,
            scope: "openid email profile".into(),
            response_type: "code".into(),
            silent_renew: false,
            silent_renew_url: None,
            use_refresh_token: false,
            start_check_session: false,
            token_refresh_in_seconds: DEFAULT_TOKEN_REFRESH_IN_SECONDS,
            renew_time_before_token_expires_in_seconds: 0,
            trigger_refresh_when_id_token_expired: true,
            disable_id_token_validation: false,
            post_login_route: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Enable silent renew through a hidden iframe loading `url`.
    pub fn with_silent_renew(mut self, url: impl Into<String>) -> Self {
        self.silent_renew = true;
        self.silent_renew_url = Some(url.into());
        self
    }

    pub fn with_refresh_tokens(mut self) -> Self {
        self.use_refresh_token = true;
        self
    }

    pub fn with_check_session(mut self) -> Self {
        self.start_check_session = true;
        self
    }

    pub fn with_token_refresh_in_seconds(mut self, secs: u64) -> Self {
        self.token_refresh_in_seconds = secs;
        self
    }

    pub fn with_renew_time_before_token_expires(mut self, secs: u64) -> Self {
        self.renew_time_before_token_expires_in_seconds = secs;
        self
    }

    pub fn with_post_login_route(mut self, route: impl Into<String>) -> Self {
        self.post_login_route = Some(route.into());
        self
    }

    /// Build the configuration at `oidc.configs.{index}`.
    ///
    /// A missing `config-id` is filled in as `{index}-{client-id}`.
    pub fn from_config(config: &OidcClientConfig, index: usize) -> Result<Self, ConfigError> {
        let prefix = format!("oidc.configs.{index}");
        let key = |name: &str| format!("{prefix}.{name}");

        let client_id: Option<String> = config.get_opt(&key("client-id"))?;
        let config_id = match config.get_opt::<String>(&key("config-id"))? {
            Some(id) if !id.is_empty() => id,
            _ => format!("{index}-{}", client_id.as_deref().unwrap_or_default()),
        };
        let defaults = Self::new(config_id, String::new());

        Ok(Self {
            authority: config.get_or(&key("authority"), String::new()),
            client_id,
            redirect_url: config.get_opt(&key("redirect-url"))?,
            post_logout_redirect_uri: config.get_opt(&key("post-logout-redirect-uri"))?,
            scope: config.get_opt(&key("scope"))?.unwrap_or(defaults.scope.clone()),
            response_type: config
                .get_opt(&key("response-type"))?
                .unwrap_or(defaults.response_type.clone()),
            silent_renew: config.get_opt(&key("silent-renew"))?.unwrap_or(false),
            silent_renew_url: config.get_opt(&key("silent-renew-url"))?,
            use_refresh_token: config.get_opt(&key("use-refresh-token"))?.unwrap_or(false),
            start_check_session: config.get_opt(&key("start-check-session"))?.unwrap_or(false),
            token_refresh_in_seconds: config
                .get_opt(&key("token-refresh-in-seconds"))?
                .unwrap_or(DEFAULT_TOKEN_REFRESH_IN_SECONDS),
            renew_time_before_token_expires_in_seconds: config
                .get_opt(&key("renew-time-before-token-expires-in-seconds"))?
                .unwrap_or(0),
            trigger_refresh_when_id_token_expired: config
                .get_opt(&key("trigger-refresh-when-id-token-expired"))?
                .unwrap_or(true),
            disable_id_token_validation: config
                .get_opt(&key("disable-id-token-validation"))?
                .unwrap_or(false),
            post_login_route: config.get_opt(&key("post-login-route"))?,
            ..defaults
        })
    }
}

/// Check a configuration set before it is handed to the client.
///
/// Hard errors: missing `authority`, missing `client-id`, duplicate ids.
/// Silent renew with refresh tokens but without `offline_access` is only
/// logged.
pub fn validate_configurations(configs: &[OpenIdConfiguration]) -> Result<(), ConfigError> {
    let mut details = Vec::new();

    for (i, c) in configs.iter().enumerate() {
        if c.authority.trim().is_empty() {
            details.push(ConfigValidationDetail {
                key: format!("oidc.configs.{i}.authority"),
                message: "authority is required".into(),
            });
        }
        if c.client_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            details.push(ConfigValidationDetail {
                key: format!("oidc.configs.{i}.client-id"),
                message: "client-id is required".into(),
            });
        }
        if configs[..i].iter().any(|other| other.config_id == c.config_id) {
            details.push(ConfigValidationDetail {
                key: format!("oidc.configs.{i}.config-id"),
                message: format!("duplicate config id '{}'", c.config_id),
            });
        }
        if c.silent_renew && c.use_refresh_token && !c.scope.split(' ').any(|s| s == "offline_access") {
            tracing::warn!(
                config_id = %c.config_id,
                "Refresh tokens with silent renew usually need the 'offline_access' scope"
            );
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(details))
    }
}
