//! Per-configuration persisted client state.
//!
//! Every value is scoped by the owning configuration's `config_id`, so
//! several configurations can share one backend without colliding.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::config::OpenIdConfiguration;

/// Keys of the values the client persists for each configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// `state` sent with the last authorization request.
    AuthStateControl,
    /// Full token response of the last successful authentication.
    AuthnResult,
    /// Current access token.
    AuthzData,
    /// Access token expiry as epoch milliseconds.
    AccessTokenExpiresAt,
    /// Discovered endpoints of the identity provider.
    AuthWellKnownEndPoints,
    UserData,
    AuthNonce,
    CodeVerifier,
    SessionState,
    StorageSilentRenewRunning,
    StorageCodeFlowInProgress,
    /// Route saved before redirecting to the identity provider.
    Redirect,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AuthStateControl => "authStateControl",
            StorageKey::AuthnResult => "authnResult",
            StorageKey::AuthzData => "authzData",
            StorageKey::AccessTokenExpiresAt => "access_token_expires_at",
            StorageKey::AuthWellKnownEndPoints => "authWellKnownEndPoints",
            StorageKey::UserData => "userData",
            StorageKey::AuthNonce => "authNonce",
            StorageKey::CodeVerifier => "codeVerifier",
            StorageKey::SessionState => "session_state",
            StorageKey::StorageSilentRenewRunning => "storageSilentRenewRunning",
            StorageKey::StorageCodeFlowInProgress => "storageCodeFlowInProgress",
            StorageKey::Redirect => "redirect",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable persistence for client state.
///
/// Implement this trait to back the client with browser storage, a session
/// store, a file, etc. Reads never fail: an unreadable value is absent.
pub trait StoragePersistence: Send + Sync + 'static {
    fn read(&self, key: StorageKey, config: &OpenIdConfiguration) -> Option<Value>;

    fn write(&self, key: StorageKey, value: Value, config: &OpenIdConfiguration);

    fn remove(&self, key: StorageKey, config: &OpenIdConfiguration);

    /// Remove every value stored for `config`.
    fn clear(&self, config: &OpenIdConfiguration);

    /// Read a value stored as a JSON string.
    fn read_str(&self, key: StorageKey, config: &OpenIdConfiguration) -> Option<String> {
        match self.read(key, config)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Drop the tokens and session of `config`, keeping flow data intact.
    fn reset_auth_state(&self, config: &OpenIdConfiguration) {
        for key in [
            StorageKey::AuthzData,
            StorageKey::AuthnResult,
            StorageKey::AccessTokenExpiresAt,
            StorageKey::SessionState,
        ] {
            self.remove(key, config);
        }
    }

    /// Drop the values that only live for one authorization round-trip.
    fn reset_flow_data(&self, config: &OpenIdConfiguration) {
        for key in [
            StorageKey::SessionState,
            StorageKey::StorageSilentRenewRunning,
            StorageKey::StorageCodeFlowInProgress,
            StorageKey::CodeVerifier,
            StorageKey::AuthNonce,
        ] {
            self.remove(key, config);
        }
    }
}

impl<T: StoragePersistence + ?Sized> StoragePersistence for Arc<T> {
    fn read(&self, key: StorageKey, config: &OpenIdConfiguration) -> Option<Value> {
        (**self).read(key, config)
    }

    fn write(&self, key: StorageKey, value: Value, config: &OpenIdConfiguration) {
        (**self).write(key, value, config)
    }

    fn remove(&self, key: StorageKey, config: &OpenIdConfiguration) {
        (**self).remove(key, config)
    }

    fn clear(&self, config: &OpenIdConfiguration) {
        (**self).clear(config)
    }
}

/// In-memory storage, for tests and non-persistent clients.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    /// Map: (config_id, key) -> value
    values: Arc<DashMap<(String, StorageKey), Value>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values across all configurations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl StoragePersistence for InMemoryStorage {
    fn read(&self, key: StorageKey, config: &OpenIdConfiguration) -> Option<Value> {
        self.values
            .get(&(config.config_id.clone(), key))
            .map(|entry| entry.value().clone())
    }

    fn write(&self, key: StorageKey, value: Value, config: &OpenIdConfiguration) {
        tracing::trace!(config_id = %config.config_id, key = %key, "Storage write");
        self.values.insert((config.config_id.clone(), key), value);
    }

    fn remove(&self, key: StorageKey, config: &OpenIdConfiguration) {
        self.values.remove(&(config.config_id.clone(), key));
    }

    fn clear(&self, config: &OpenIdConfiguration) {
        self.values.retain(|(config_id, _), _| config_id != &config.config_id);
    }
}
