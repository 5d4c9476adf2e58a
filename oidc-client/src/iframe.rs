//! Hooks for the session-monitoring and silent-renew iframes.
//!
//! Both are host concerns; the client only decides when to start them.

use oidc_client_core::{OpenIdConfiguration, StorageKey, StoragePersistence};

/// Session monitoring through the provider's check-session iframe.
pub trait CheckSession: Send + Sync + 'static {
    /// Defaults to [`is_check_session_configured`] over the stored discovery
    /// document.
    fn is_check_session_configured(&self, config: &OpenIdConfiguration, storage: &dyn StoragePersistence) -> bool {
        is_check_session_configured(storage, config)
    }

    fn start(&self, config: &OpenIdConfiguration);
}

/// Whether `config` asks for session monitoring and the provider advertises
/// a `check_session_iframe` endpoint.
pub fn is_check_session_configured(storage: &dyn StoragePersistence, config: &OpenIdConfiguration) -> bool {
    if !config.start_check_session {
        return false;
    }
    storage
        .read(StorageKey::AuthWellKnownEndPoints, config)
        .and_then(|endpoints| {
            endpoints
                .get("checkSessionIframe")
                .or_else(|| endpoints.get("check_session_iframe"))
                .and_then(|v| v.as_str())
                .map(|s| !s.is_empty())
        })
        .unwrap_or(false)
}

/// Used when the host has no check-session iframe; never configured since
/// there is nothing to start.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCheckSession;

impl CheckSession for NoCheckSession {
    fn is_check_session_configured(&self, _config: &OpenIdConfiguration, _storage: &dyn StoragePersistence) -> bool {
        false
    }

    fn start(&self, _config: &OpenIdConfiguration) {}
}

/// The hidden iframe used to renew tokens without refresh tokens.
pub trait SilentRenew: Send + Sync + 'static {
    fn is_silent_renew_configured(&self, config: &OpenIdConfiguration) -> bool {
        config.silent_renew && !config.use_refresh_token
    }

    fn get_or_create_iframe(&self, config: &OpenIdConfiguration);
}

/// Leaves iframe creation to nobody.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSilentRenew;

impl SilentRenew for NoSilentRenew {
    fn is_silent_renew_configured(&self, _config: &OpenIdConfiguration) -> bool {
        false
    }

    fn get_or_create_iframe(&self, _config: &OpenIdConfiguration) {}
}
