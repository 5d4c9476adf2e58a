//! Authentication state backed by persisted tokens.

use std::sync::Arc;

use chrono::Utc;
use oidc_client_core::{EventType, OpenIdConfiguration, PublicEventsService, StorageKey, StoragePersistence};
use serde_json::Value;
use tokio::sync::watch;

use crate::result::{AuthStateResult, AuthenticatedResult, ConfigAuthenticatedResult};
use crate::token_helper;

/// Authentication state as seen by the check orchestrator.
pub trait AuthState: Send + Sync + 'static {
    /// Whether tokens are stored for `config`, regardless of expiry.
    fn is_authenticated(&self, config: &OpenIdConfiguration) -> bool;

    /// Whether the stored tokens of `config` are present and unexpired.
    fn are_auth_storage_tokens_valid(&self, config: &OpenIdConfiguration) -> bool;

    /// Publish "authenticated" for the configuration set.
    fn set_authenticated_and_fire_event(&self, all_configs: &[OpenIdConfiguration]);

    fn get_access_token(&self, config: &OpenIdConfiguration) -> Option<String>;

    fn get_id_token(&self, config: &OpenIdConfiguration) -> Option<String>;
}

/// [`AuthState`] over a [`StoragePersistence`] backend.
///
/// The aggregated state is observable through [`AuthStateService::authenticated`].
#[derive(Clone)]
pub struct AuthStateService {
    storage: Arc<dyn StoragePersistence>,
    events: PublicEventsService,
    authenticated: Arc<watch::Sender<AuthenticatedResult>>,
}

impl AuthStateService {
    pub fn new(storage: Arc<dyn StoragePersistence>, events: PublicEventsService) -> Self {
        let (tx, _) = watch::channel(AuthenticatedResult::default());
        Self {
            storage,
            events,
            authenticated: Arc::new(tx),
        }
    }

    /// Receiver of the aggregated authentication state. Starts unauthenticated.
    pub fn authenticated(&self) -> watch::Receiver<AuthenticatedResult> {
        self.authenticated.subscribe()
    }

    /// Drop the tokens of `current_config` and publish the new aggregate.
    pub fn set_unauthenticated_and_fire_event(
        &self,
        current_config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) {
        self.storage.reset_auth_state(current_config);
        let result = if all_configs.len() <= 1 {
            AuthenticatedResult {
                is_authenticated: false,
                all_configs_authenticated: vec![ConfigAuthenticatedResult {
                    config_id: current_config.config_id.clone(),
                    is_authenticated: false,
                }],
            }
        } else {
            self.check_all_configs(all_configs)
        };
        self.authenticated.send_replace(result);
    }

    pub fn update_and_publish_auth_state(&self, config_id: &str, result: &AuthStateResult) {
        let value = serde_json::to_value(result).ok();
        self.events
            .fire_event(EventType::NewAuthenticationResult, Some(config_id), value);
    }

    /// Persist a token response and publish "authenticated".
    ///
    /// `auth_result` is the raw token endpoint response; its `expires_in`
    /// (seconds) becomes the stored access-token expiry. An `expires_in` too
    /// large to represent leaves the access token without an expiry.
    pub fn set_authorization_data(
        &self,
        access_token: &str,
        auth_result: Value,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) {
        tracing::debug!(config_id = %config.config_id, "Storing authorization data");
        if let Some(expires_in) = auth_result.get("expires_in").and_then(Value::as_i64) {
            let expires_at = expires_in
                .checked_mul(1000)
                .and_then(|ms| Utc::now().timestamp_millis().checked_add(ms));
            match expires_at {
                Some(at) => self
                    .storage
                    .write(StorageKey::AccessTokenExpiresAt, Value::from(at), config),
                None => {
                    tracing::warn!(config_id = %config.config_id, expires_in, "Ignoring out-of-range expires_in");
                    self.storage.remove(StorageKey::AccessTokenExpiresAt, config);
                }
            }
        }
        self.storage
            .write(StorageKey::AuthzData, Value::from(access_token), config);
        self.storage.write(StorageKey::AuthnResult, auth_result, config);
        self.set_authenticated_and_fire_event(all_configs);
    }

    pub fn get_refresh_token(&self, config: &OpenIdConfiguration) -> Option<String> {
        if !self.is_authenticated(config) {
            return None;
        }
        self.auth_result_field(config, "refresh_token")
    }

    pub fn get_authentication_result(&self, config: &OpenIdConfiguration) -> Option<Value> {
        if !self.is_authenticated(config) {
            return None;
        }
        self.storage.read(StorageKey::AuthnResult, config)
    }

    /// Whether the id token is expired and expiry should trigger a refresh.
    ///
    /// Fires `IdTokenExpired` when it is.
    pub fn has_id_token_expired_and_renew_check_is_enabled(&self, config: &OpenIdConfiguration) -> bool {
        if !config.trigger_refresh_when_id_token_expired || config.disable_id_token_validation {
            return false;
        }
        let Some(id_token) = self.auth_result_field(config, "id_token") else {
            return false;
        };
        let expired = token_helper::has_token_expired(
            &id_token,
            config.renew_time_before_token_expires_in_seconds,
        );
        if expired {
            self.events.fire_event(
                EventType::IdTokenExpired,
                Some(&config.config_id),
                Some(Value::Bool(true)),
            );
        }
        expired
    }

    /// Whether the stored access-token expiry has passed. No stored expiry
    /// means the token does not expire. Fires `TokenExpired` when it has.
    pub fn has_access_token_expired_if_expiry_exists(&self, config: &OpenIdConfiguration) -> bool {
        let Some(expires_at) = self
            .storage
            .read(StorageKey::AccessTokenExpiresAt, config)
            .and_then(|v| v.as_i64())
        else {
            return false;
        };
        let expired = token_helper::has_expiry_passed_at(
            expires_at,
            config.renew_time_before_token_expires_in_seconds,
            Utc::now(),
        );
        if expired {
            self.events.fire_event(
                EventType::TokenExpired,
                Some(&config.config_id),
                Some(Value::Bool(true)),
            );
        }
        expired
    }

    fn auth_result_field(&self, config: &OpenIdConfiguration, field: &str) -> Option<String> {
        self.storage
            .read(StorageKey::AuthnResult, config)?
            .get(field)?
            .as_str()
            .map(str::to_string)
    }

    fn check_all_configs(&self, all_configs: &[OpenIdConfiguration]) -> AuthenticatedResult {
        let all_configs_authenticated: Vec<_> = all_configs
            .iter()
            .map(|config| ConfigAuthenticatedResult {
                config_id: config.config_id.clone(),
                is_authenticated: self.is_authenticated(config),
            })
            .collect();
        AuthenticatedResult {
            is_authenticated: all_configs_authenticated.iter().all(|c| c.is_authenticated),
            all_configs_authenticated,
        }
    }
}

impl AuthState for AuthStateService {
    fn is_authenticated(&self, config: &OpenIdConfiguration) -> bool {
        let has_access_token = self
            .storage
            .read_str(StorageKey::AuthzData, config)
            .is_some_and(|t| !t.is_empty());
        has_access_token && self.auth_result_field(config, "id_token").is_some()
    }

    fn are_auth_storage_tokens_valid(&self, config: &OpenIdConfiguration) -> bool {
        if !self.is_authenticated(config) {
            return false;
        }
        if self.has_id_token_expired_and_renew_check_is_enabled(config) {
            tracing::debug!(config_id = %config.config_id, "Persisted id token is expired");
            return false;
        }
        if self.has_access_token_expired_if_expiry_exists(config) {
            tracing::debug!(config_id = %config.config_id, "Persisted access token is expired");
            return false;
        }
        true
    }

    fn set_authenticated_and_fire_event(&self, all_configs: &[OpenIdConfiguration]) {
        let result = match all_configs {
            [single] => AuthenticatedResult {
                is_authenticated: true,
                all_configs_authenticated: vec![ConfigAuthenticatedResult {
                    config_id: single.config_id.clone(),
                    is_authenticated: true,
                }],
            },
            many => self.check_all_configs(many),
        };
        self.authenticated.send_replace(result);
    }

    fn get_access_token(&self, config: &OpenIdConfiguration) -> Option<String> {
        if !self.is_authenticated(config) {
            return None;
        }
        self.storage.read_str(StorageKey::AuthzData, config)
    }

    fn get_id_token(&self, config: &OpenIdConfiguration) -> Option<String> {
        if !self.is_authenticated(config) {
            return None;
        }
        self.auth_result_field(config, "id_token")
    }
}
