//! Picking the configuration a check runs against.

use oidc_client_core::{query_param, CurrentUrlService, OpenIdConfiguration, StorageKey, StoragePersistence};

use crate::error::CheckAuthError;

/// The non-empty `state` query parameter of `url`, or of the current URL when
/// no URL is given.
pub fn state_param(current_url: &CurrentUrlService, url: Option<&str>) -> Option<String> {
    match url {
        Some(url) => query_param(url, "state").filter(|state| !state.is_empty()),
        None => current_url.get_state_param_from_current_url(),
    }
}

/// The one configuration whose stored `authStateControl` equals `state`.
pub fn find_config_for_state<'a>(
    storage: &dyn StoragePersistence,
    state: &str,
    all_configs: &'a [OpenIdConfiguration],
) -> Result<&'a OpenIdConfiguration, CheckAuthError> {
    let matches: Vec<&OpenIdConfiguration> = all_configs
        .iter()
        .filter(|config| {
            storage
                .read_str(StorageKey::AuthStateControl, config)
                .is_some_and(|stored| stored == state)
        })
        .collect();

    match matches.as_slice() {
        [single] => Ok(single),
        [] => Err(CheckAuthError::ConfigNotFound {
            state: state.to_string(),
        }),
        many => Err(CheckAuthError::AmbiguousState {
            state: state.to_string(),
            config_ids: many.iter().map(|c| c.config_id.clone()).collect(),
        }),
    }
}

/// Resolve the configuration to check.
///
/// A `state` on the URL wins over `requested`; without one, `requested` is
/// used, then the first configuration.
pub fn resolve<'a>(
    storage: &dyn StoragePersistence,
    current_url: &CurrentUrlService,
    requested: Option<&'a OpenIdConfiguration>,
    all_configs: &'a [OpenIdConfiguration],
    url: Option<&str>,
) -> Result<&'a OpenIdConfiguration, CheckAuthError> {
    if let Some(state) = state_param(current_url, url) {
        return find_config_for_state(storage, &state, all_configs);
    }
    requested
        .or_else(|| all_configs.first())
        .ok_or(CheckAuthError::NoConfiguration)
}
